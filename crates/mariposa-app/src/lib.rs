//! Mariposa Application
//!
//! Native host pieces for the canvas engine: config file lookup, the
//! desktop clipboard and the scripted replay driver.

#[cfg(feature = "native")]
mod clipboard;
#[cfg(not(target_arch = "wasm32"))]
mod config;
mod script;

#[cfg(feature = "native")]
pub use clipboard::ArboardClipboard;
#[cfg(not(target_arch = "wasm32"))]
pub use config::{default_config_path, load_config};
pub use script::{MenuOpened, ReplayReport, Step, run_script};

/// Encode RGBA pixels as PNG.
pub fn encode_png(rgba_data: &[u8], width: u32, height: u32) -> Option<Vec<u8>> {
    let mut png_data = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut png_data, width, height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);

        let mut writer = match encoder.write_header() {
            Ok(w) => w,
            Err(e) => {
                log::error!("Failed to write PNG header: {:?}", e);
                return None;
            }
        };

        if let Err(e) = writer.write_image_data(rgba_data) {
            log::error!("Failed to write PNG data: {:?}", e);
            return None;
        }
    }

    Some(png_data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_png_signature() {
        let pixels = vec![255u8; 2 * 2 * 4];
        let png = encode_png(&pixels, 2, 2).unwrap();
        assert_eq!(&png[1..4], b"PNG");
    }

    #[test]
    fn test_encode_png_rejects_short_data() {
        assert!(encode_png(&[0u8; 3], 2, 2).is_none());
    }
}
