//! Brand-preference selection policy

use super::types::Device;

/// Brands preferred when picking a device automatically
pub const PREFERRED_BRANDS: [&str; 3] = ["canon", "sony", "nikon"];

/// Pick the device to activate after discovery
///
/// Returns the first device (in scan order) whose model contains any
/// preferred brand, case-insensitively, and whether a brand matched.
/// Without a match the first device is used. `None` for an empty slice.
pub fn select_preferred(devices: &[Device]) -> Option<(&Device, bool)> {
    devices
        .iter()
        .find(|device| {
            let model = device.model.to_lowercase();
            PREFERRED_BRANDS.iter().any(|brand| model.contains(brand))
        })
        .map(|device| (device, true))
        .or_else(|| devices.first().map(|device| (device, false)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn devices(models: &[&str]) -> Vec<Device> {
        models
            .iter()
            .enumerate()
            .map(|(i, model)| Device::new(*model, format!("usb:{:03}", i + 1)))
            .collect()
    }

    #[test]
    fn test_empty() {
        assert!(select_preferred(&[]).is_none());
    }

    #[test]
    fn test_fallback_to_first() {
        let list = devices(&["Generic Cam", "Webcam HD", "PTP Device"]);
        let (picked, matched) = select_preferred(&list).unwrap();
        assert_eq!(picked.port, "usb:001");
        assert!(!matched);
    }

    #[test]
    fn test_first_match_wins_regardless_of_brand_order() {
        // Nikon is scanned before Canon, so it wins even though "canon" is
        // listed first among the preferred brands.
        let list = devices(&["Generic Cam", "Nikon D90", "Canon EOS R5"]);
        let (picked, matched) = select_preferred(&list).unwrap();
        assert_eq!(picked.model, "Nikon D90");
        assert!(matched);
    }

    #[test]
    fn test_case_insensitive() {
        let list = devices(&["webcam", "SONY ILCE-7M3"]);
        let (picked, _) = select_preferred(&list).unwrap();
        assert_eq!(picked.model, "SONY ILCE-7M3");
    }

    #[test]
    fn test_match_at_any_position() {
        for position in 0..4 {
            let mut models = vec!["Generic A", "Generic B", "Generic C", "Generic D"];
            models[position] = "Canon EOS 80D";
            let list = devices(&models);
            let (picked, matched) = select_preferred(&list).unwrap();
            assert!(matched);
            assert_eq!(picked.port, format!("usb:{:03}", position + 1));
        }
    }
}
