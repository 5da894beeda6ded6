//! Scene replay tool (native).
//!
//! `mariposa-replay <scene.json> <script.json> [config.json]`
//!
//! Loads the scene into an in-memory store, runs the script against it and
//! prints the resulting items as JSON.

#[cfg(feature = "native")]
mod replay {
    use mariposa_app::{ArboardClipboard, ReplayReport, Step, load_config, run_script};
    use mariposa_core::{
        CanvasEngine, CanvasSession, Instant, Item, LocalClipboard, MemoryStore, NoSystemClipboard, StoreError,
        SystemClipboard,
    };
    use std::path::{Path, PathBuf};
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum ReplayError {
        #[error("usage: mariposa-replay <scene.json> <script.json> [config.json]")]
        Usage,
        #[error("Failed to read {path}: {source}")]
        Io {
            path: PathBuf,
            source: std::io::Error,
        },
        #[error("Invalid JSON in {path}: {source}")]
        Json {
            path: PathBuf,
            source: serde_json::Error,
        },
        #[error("Store error: {0}")]
        Store(#[from] StoreError),
        #[error("Failed to write report: {0}")]
        Output(serde_json::Error),
    }

    fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ReplayError> {
        let text = std::fs::read_to_string(path).map_err(|source| ReplayError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ReplayError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    async fn replay<C: SystemClipboard>(
        engine: CanvasEngine,
        scene: Vec<Item>,
        steps: &[Step],
        system: C,
    ) -> Result<ReplayReport, ReplayError> {
        let mut session = CanvasSession::new(engine, MemoryStore::with_items(scene), system);
        session.refresh().await?;
        Ok(run_script(&mut session, steps, Instant::now()).await)
    }

    pub fn run(args: &[String]) -> Result<(), ReplayError> {
        let (scene_path, script_path) = match args {
            [scene, script, ..] => (Path::new(scene), Path::new(script)),
            _ => return Err(ReplayError::Usage),
        };
        let config = load_config(args.get(2).map(Path::new));

        let scene: Vec<Item> = read_json(scene_path)?;
        let steps: Vec<Step> = read_json(script_path)?;
        log::info!("Replaying {} steps over {} items", steps.len(), scene.len());

        let engine = CanvasEngine::new(config, LocalClipboard::new());
        let report = match ArboardClipboard::detect() {
            Ok(system) => pollster::block_on(replay(engine, scene, &steps, system))?,
            Err(e) => {
                log::warn!("System clipboard unavailable ({}), using local clipboard only", e);
                pollster::block_on(replay(engine, scene, &steps, NoSystemClipboard))?
            }
        };

        let json = serde_json::to_string_pretty(&report).map_err(ReplayError::Output)?;
        println!("{}", json);
        Ok(())
    }
}

#[cfg(feature = "native")]
fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if let Err(e) = replay::run(&args) {
        log::error!("{}", e);
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

#[cfg(not(feature = "native"))]
fn main() {
    panic!("Native feature not enabled. Use `cargo run --features native`");
}
