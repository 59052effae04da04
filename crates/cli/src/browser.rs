use {
    tripwire_oauth::{Error, Navigator, Result},
    url::Url,
};

/// Opens the authorization URL in the user's default browser.
pub struct BrowserNavigator;

impl Navigator for BrowserNavigator {
    fn redirect_to(&self, url: &Url) -> Result<()> {
        open::that(url.as_str()).map_err(|e| Error::Navigation {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}
