//! Login: obtain the credential a run authenticates with.
//!
//! Three ways in, checked in order:
//! - `--login` runs the interactive offline OAuth flow and stores the
//!   resulting refresh token
//! - `--token` stores a long-lived access token as given
//! - otherwise the credential stored in the metadata file is used

use std::io::{BufRead, Write};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::now;
use crate::error::{Error, Result};
use crate::model::Credential;
use crate::remote::dropbox::OAuthFlow;
use crate::storage::MetaStore;

/// How the user asked to authenticate.
#[derive(Debug, Clone, Default)]
pub struct LoginRequest<'a> {
    pub interactive: bool,
    pub token: Option<&'a str>,
    pub app_key: Option<&'a str>,
    pub timeout: Duration,
}

/// Resolve the credential for a run, storing a new one if requested.
///
/// # Errors
///
/// Returns [`Error::LoginCancelled`] if the interactive flow got no code,
/// [`Error::NotLoggedIn`] if no usable credential is available, or the
/// underlying storage/remote error.
pub fn execute(store: &MetaStore, request: &LoginRequest<'_>, local: &Path) -> Result<Credential> {
    if request.interactive {
        let app_key = request.app_key.ok_or_else(|| {
            Error::Config("Interactive login needs an app key (--app-key or DROPMIRROR_APP_KEY)".into())
        })?;
        let flow = OAuthFlow::new(app_key);
        let stdin = std::io::stdin();
        let code = prompt_code(&mut stdin.lock(), &mut std::io::stdout(), &flow.authorize_url())?
            .ok_or(Error::LoginCancelled)?;
        let credential = flow.finish(&code, request.timeout)?;
        store.save_credential(&credential)?;
        info!("Logged in");
    } else if let Some(token) = request.token {
        store.save_credential(&Credential::from_access_token(token))?;
        debug!("Stored access token");
    }

    let now = now();
    let purged = store.purge_expired_credentials(now)?;
    if purged > 0 {
        debug!(purged, "Dropped expired logins");
    }

    store
        .credential(now)?
        .filter(Credential::is_usable)
        .ok_or_else(|| Error::NotLoggedIn {
            local: local.to_path_buf(),
        })
}

/// Show the authorization URL and read the code the user pastes back.
///
/// Returns `None` for empty input.
fn prompt_code<R: BufRead, W: Write>(input: &mut R, output: &mut W, url: &str) -> Result<Option<String>> {
    writeln!(output, "\nPlease go to\n  {url}\nand approve access.")?;
    write!(output, "Please enter the code: ")?;
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    let code = line.trim();
    Ok((!code.is_empty()).then(|| code.to_string()))
}
