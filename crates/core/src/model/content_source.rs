use thiserror::Error;
use url::Url;

/// Connection settings for the adaptive quiz content source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContentSourceSettings {
    base_url: Url,
    access_token: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct ContentSourceSettingsDraft {
    pub base_url: Option<String>,
    pub access_token: Option<String>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ContentSourceSettingsError {
    #[error("adaptive content base URL is missing")]
    MissingBaseUrl,
    #[error("invalid adaptive content base URL")]
    InvalidBaseUrl,
}

impl ContentSourceSettingsDraft {
    /// Validate and normalize the draft.
    ///
    /// # Errors
    ///
    /// Returns `ContentSourceSettingsError` when the base URL is absent or unparsable.
    pub fn validate(self) -> Result<ContentSourceSettings, ContentSourceSettingsError> {
        let base_url = normalize_optional(self.base_url)
            .ok_or(ContentSourceSettingsError::MissingBaseUrl)?;
        let base_url =
            Url::parse(&base_url).map_err(|_| ContentSourceSettingsError::InvalidBaseUrl)?;
        if base_url.cannot_be_a_base() {
            return Err(ContentSourceSettingsError::InvalidBaseUrl);
        }

        Ok(ContentSourceSettings {
            base_url,
            access_token: normalize_optional(self.access_token),
        })
    }
}

impl ContentSourceSettings {
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    #[must_use]
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|val| val.trim().to_string())
        .filter(|val| !val.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_and_trims() {
        let settings = ContentSourceSettingsDraft {
            base_url: Some(" https://content.example.com/api ".into()),
            access_token: Some("   ".into()),
        }
        .validate()
        .unwrap();
        assert_eq!(settings.base_url().host_str(), Some("content.example.com"));
        assert_eq!(settings.access_token(), None);
    }

    #[test]
    fn rejects_missing_or_bad_url() {
        assert_eq!(
            ContentSourceSettingsDraft::default().validate().unwrap_err(),
            ContentSourceSettingsError::MissingBaseUrl
        );
        let err = ContentSourceSettingsDraft {
            base_url: Some("not a url".into()),
            access_token: None,
        }
        .validate()
        .unwrap_err();
        assert_eq!(err, ContentSourceSettingsError::InvalidBaseUrl);
    }
}
