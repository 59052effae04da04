use url::Url;

use crate::error::Result;

/// Hands the authorization URL to whatever shows it to the user. Once this
/// returns the login attempt continues outside the process.
pub trait Navigator: Send + Sync {
    fn redirect_to(&self, url: &Url) -> Result<()>;
}

impl<F> Navigator for F
where
    F: Fn(&Url) -> Result<()> + Send + Sync,
{
    fn redirect_to(&self, url: &Url) -> Result<()> {
        self(url)
    }
}
