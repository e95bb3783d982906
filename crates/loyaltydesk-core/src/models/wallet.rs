//! Loyalty wallet branding (colors plus icon, logo and cover image).

use std::path::Path;

use anyhow::{Context, Result};

use crate::api::transport::FormPart;
use crate::api::ApiError;

#[derive(Clone, PartialEq)]
pub struct WalletImage {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for WalletImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletImage")
            .field("file_name", &self.file_name)
            .field("mime", &self.mime)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl WalletImage {
    /// Read an image from disk, inferring the MIME type from the extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let mime = mime_for_path(path)
            .with_context(|| format!("Unsupported image type: {}", path.display()))?;
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read image {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        Ok(Self {
            file_name,
            mime: mime.to_string(),
            bytes,
        })
    }
}

fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "svg" => Some("image/svg+xml"),
        _ => None,
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WalletBranding {
    pub primary_color: Option<String>,
    pub secondary_color: Option<String>,
    pub bg_color: Option<String>,
    pub icon: Option<WalletImage>,
    pub logo: Option<WalletImage>,
    pub cover_image: Option<WalletImage>,
}

impl WalletBranding {
    fn colors(&self) -> [(&'static str, Option<&str>); 3] {
        fn color(c: &Option<String>) -> Option<&str> {
            c.as_deref().map(str::trim).filter(|c| !c.is_empty())
        }
        [
            ("primaryColor", color(&self.primary_color)),
            ("secondaryColor", color(&self.secondary_color)),
            ("bgColor", color(&self.bg_color)),
        ]
    }

    fn images(&self) -> [(&'static str, Option<&WalletImage>); 3] {
        [
            ("walletCoverImage", self.cover_image.as_ref()),
            ("walletLogo", self.logo.as_ref()),
            ("walletIcon", self.icon.as_ref()),
        ]
    }

    /// A new wallet needs every color and every image.
    pub fn validate_for_create(&self) -> Result<(), ApiError> {
        if self.colors().iter().any(|(_, c)| c.is_none()) {
            return Err(ApiError::Validation("Please select all color fields.".into()));
        }
        if self.images().iter().any(|(_, i)| i.is_none()) {
            return Err(ApiError::Validation(
                "Please upload all images: icon, logo, and cover image.".into(),
            ));
        }
        Ok(())
    }

    /// An update needs at least one color or image.
    pub fn validate_for_update(&self) -> Result<(), ApiError> {
        let has_color = self.colors().iter().any(|(_, c)| c.is_some());
        let has_image = self.images().iter().any(|(_, i)| i.is_some());
        if !(has_color || has_image) {
            return Err(ApiError::Validation(
                "Please select at least one color or one image to update.".into(),
            ));
        }
        Ok(())
    }

    /// Multipart fields for the provided colors and images.
    pub(crate) fn form_parts(&self) -> Vec<FormPart> {
        let colors = self.colors().into_iter().filter_map(|(name, value)| {
            value.map(|v| FormPart::Text {
                name: name.to_string(),
                value: v.to_string(),
            })
        });
        let images = self.images().into_iter().filter_map(|(name, image)| {
            image.map(|i| FormPart::File {
                name: name.to_string(),
                file_name: i.file_name.clone(),
                mime: i.mime.clone(),
                bytes: i.bytes.clone(),
            })
        });
        colors.chain(images).collect()
    }
}
