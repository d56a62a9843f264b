//! Image URL building
//!
//! Upstream images served over plain http would trigger mixed-content
//! warnings, so they are either upgraded to https or routed through the
//! gateway's image proxy with a signed URL.

use crate::config::ImageSettings;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use hmac::digest::InvalidLength;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::warn;

type HmacSha256 = Hmac<Sha256>;

/// Builds image URLs for offers
#[derive(Debug, Clone, Default)]
pub struct ImageUrls {
    settings: ImageSettings,
}

impl ImageUrls {
    pub fn new(settings: ImageSettings) -> Self {
        Self { settings }
    }

    /// Base URL of the local assets folder
    fn assets_url(&self) -> String {
        format!("{}/assets/images/", self.settings.host_url.trim_end_matches('/'))
    }

    /// URL of a file in the local assets folder, or the placeholder
    pub fn local(&self, file: &str) -> String {
        let file = if file.is_empty() {
            self.settings.placeholder.as_str()
        } else {
            file
        };
        format!("{}{}", self.assets_url(), file)
    }

    /// URL for an image hosted by an upstream
    pub fn external(&self, src: &str, proxy_required: bool) -> String {
        if src.trim().is_empty() {
            return self.local("");
        }

        if proxy_required {
            match self.sign(src) {
                Ok(sig) => {
                    let encoded = URL_SAFE_NO_PAD.encode(src.as_bytes());
                    return format!("{}?url={}&sig={}", self.settings.proxy_host, encoded, sig);
                }
                Err(e) => warn!("Cannot sign image URL {}: {}", src, e),
            }
        }

        match src.strip_prefix("http://") {
            Some(rest) => format!("https://{}", rest),
            None => src.to_string(),
        }
    }

    /// HMAC-SHA256 of the source URL, base64url encoded
    fn sign(&self, src: &str) -> Result<String, InvalidLength> {
        let mut mac = HmacSha256::new_from_slice(self.settings.proxy_secret.as_bytes())?;
        mac.update(src.as_bytes());
        Ok(URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn urls() -> ImageUrls {
        ImageUrls::new(ImageSettings {
            host_url: "https://offers.example.com/".to_string(),
            proxy_host: "https://offers.example.com/img".to_string(),
            proxy_secret: "secret".to_string(),
            placeholder: "image-placeholder.png".to_string(),
        })
    }

    #[test]
    fn test_placeholder_for_missing_image() {
        assert_eq!(
            urls().external("", false),
            "https://offers.example.com/assets/images/image-placeholder.png"
        );
        assert_eq!(
            urls().local("walmart-logo.png"),
            "https://offers.example.com/assets/images/walmart-logo.png"
        );
    }

    #[test]
    fn test_http_upgraded_without_proxy() {
        assert_eq!(
            urls().external("http://i5.walmartimages.com/a.jpeg", false),
            "https://i5.walmartimages.com/a.jpeg"
        );
        assert_eq!(
            urls().external("https://pisces.bbystatic.com/b.jpg", false),
            "https://pisces.bbystatic.com/b.jpg"
        );
    }

    #[test]
    fn test_proxied_url_is_signed() {
        let urls = urls();
        let src = "http://i5.walmartimages.com/a.jpeg";
        let proxied = urls.external(src, true);

        assert!(proxied.starts_with("https://offers.example.com/img?url="));
        let (query, sig) = proxied.split_once("&sig=").unwrap();
        let encoded = query.split_once("?url=").unwrap().1;
        assert_eq!(URL_SAFE_NO_PAD.decode(encoded).unwrap(), src.as_bytes());

        let mut mac = HmacSha256::new_from_slice(b"secret").unwrap();
        mac.update(src.as_bytes());
        mac.verify_slice(&URL_SAFE_NO_PAD.decode(sig).unwrap()).unwrap();

        let other = urls.external("http://evil.example.com/x.jpeg", true);
        assert!(!other.ends_with(sig));
    }
}
