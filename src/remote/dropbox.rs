//! Dropbox HTTP API v2 adapter.
//!
//! Uses an async `reqwest` client driven by a private current-thread tokio
//! runtime, so every call blocks the caller like the rest of the mirror.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, trace};

use super::{ListPage, RemoteStore};
use crate::error::{Error, Result};
use crate::model::{Credential, EntryKind, FileInfo, RemoteEntry};

const API_URL: &str = "https://api.dropboxapi.com";
const CONTENT_URL: &str = "https://content.dropboxapi.com";
const AUTHORIZE_URL: &str = "https://www.dropbox.com/oauth2/authorize";

// ── Wire types ────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ListFolderArg<'a> {
    path: &'a str,
    recursive: bool,
    include_deleted: bool,
}

#[derive(Debug, Serialize)]
struct ListFolderContinueArg<'a> {
    cursor: &'a str,
}

#[derive(Debug, Serialize)]
struct DownloadArg<'a> {
    path: &'a str,
}

#[derive(Debug, Deserialize)]
struct ListFolderResult {
    entries: Vec<WireMetadata>,
    cursor: String,
    has_more: bool,
}

#[derive(Debug, Deserialize)]
struct SymlinkInfo {
    target: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = ".tag", rename_all = "snake_case")]
enum WireMetadata {
    File {
        name: String,
        path_lower: Option<String>,
        path_display: Option<String>,
        id: String,
        size: u64,
        content_hash: Option<String>,
        client_modified: DateTime<Utc>,
        server_modified: DateTime<Utc>,
        rev: String,
        symlink_info: Option<SymlinkInfo>,
    },
    Folder {
        name: String,
        path_lower: Option<String>,
        path_display: Option<String>,
        id: String,
    },
    Deleted {
        name: String,
        path_lower: Option<String>,
        path_display: Option<String>,
    },
}

impl WireMetadata {
    fn into_entry(self) -> RemoteEntry {
        let (name, path_lower, path_display, id, kind) = match self {
            Self::File {
                name,
                path_lower,
                path_display,
                id,
                size,
                content_hash,
                client_modified,
                server_modified,
                rev,
                symlink_info,
            } => (
                name,
                path_lower,
                path_display,
                Some(id),
                EntryKind::File(FileInfo {
                    size,
                    content_hash: content_hash.unwrap_or_default(),
                    client_modified,
                    server_modified,
                    rev,
                    symlink_target: symlink_info.and_then(|s| s.target),
                }),
            ),
            Self::Folder {
                name,
                path_lower,
                path_display,
                id,
            } => (name, path_lower, path_display, Some(id), EntryKind::Folder),
            Self::Deleted {
                name,
                path_lower,
                path_display,
            } => (name, path_lower, path_display, None, EntryKind::Deleted),
        };

        let path_display = path_display
            .or_else(|| path_lower.clone())
            .unwrap_or_else(|| format!("/{name}"));
        let path_lower = path_lower.unwrap_or_else(|| path_display.to_lowercase());
        RemoteEntry {
            name,
            path_lower,
            path_display,
            id,
            kind,
        }
    }
}

/// Response of the `/oauth2/token` endpoint.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: Option<i64>,
    pub refresh_token: Option<String>,
    pub account_id: Option<String>,
    pub uid: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error_summary: Option<String>,
    error_description: Option<String>,
}

fn new_runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| Error::Other(format!("Failed to create async runtime: {e}")))
}

/// Turn a non-success response into [`Error::Remote`].
async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorBody>(&text)
        .ok()
        .and_then(|body| body.error_summary.or(body.error_description))
        .unwrap_or(text);
    Err(Error::Remote {
        status: status.as_u16(),
        message,
    })
}

// ── OAuth ─────────────────────────────────────────────────────

/// Offline ("no redirect") PKCE authorization flow.
///
/// Uses the `plain` challenge method: the verifier itself is sent as the
/// challenge.
#[derive(Debug, Clone)]
pub struct OAuthFlow {
    app_key: String,
    verifier: String,
}

impl OAuthFlow {
    #[must_use]
    pub fn new(app_key: &str) -> Self {
        let verifier = format!(
            "{}{}",
            uuid::Uuid::new_v4().simple(),
            uuid::Uuid::new_v4().simple()
        );
        Self {
            app_key: app_key.to_string(),
            verifier,
        }
    }

    /// URL the user opens to approve access.
    #[must_use]
    pub fn authorize_url(&self) -> String {
        format!(
            "{AUTHORIZE_URL}?client_id={}&response_type=code&token_access_type=offline\
             &code_challenge={}&code_challenge_method=plain",
            self.app_key, self.verifier
        )
    }

    /// Exchange the code shown to the user for a long-lived credential.
    ///
    /// # Errors
    ///
    /// Returns an error if the exchange fails or no refresh token comes back.
    pub fn finish(&self, code: &str, timeout: Duration) -> Result<Credential> {
        let runtime = new_runtime()?;
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        let form = [
            ("code", code.trim()),
            ("grant_type", "authorization_code"),
            ("client_id", self.app_key.as_str()),
            ("code_verifier", self.verifier.as_str()),
        ];

        let token: TokenResponse = runtime.block_on(async {
            let response = http
                .post(format!("{API_URL}/oauth2/token"))
                .form(&form)
                .send()
                .await?;
            Ok::<_, Error>(check(response).await?.json().await?)
        })?;

        let refresh = token
            .refresh_token
            .ok_or_else(|| Error::Other("Login did not return a refresh token".into()))?;
        Ok(Credential::from_refresh_token(
            &refresh,
            token.account_id,
            token.uid,
        ))
    }
}

// ── Client ────────────────────────────────────────────────────

/// Blocking Dropbox client.
pub struct DropboxClient {
    runtime: tokio::runtime::Runtime,
    http: reqwest::Client,
    access_token: String,
    api_url: String,
    content_url: String,
}

impl std::fmt::Debug for DropboxClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DropboxClient")
            .field("api_url", &self.api_url)
            .field("content_url", &self.content_url)
            .finish_non_exhaustive()
    }
}

impl DropboxClient {
    /// Connect with a stored credential.
    ///
    /// A credential holding only a refresh token is exchanged for a
    /// short-lived access token first, which needs the app key.
    ///
    /// # Errors
    ///
    /// Returns an error if the credential is unusable or the refresh fails.
    pub fn connect(credential: &Credential, app_key: Option<&str>, timeout: Duration) -> Result<Self> {
        let runtime = new_runtime()?;
        let http = reqwest::Client::builder().timeout(timeout).build()?;

        let access_token = match (&credential.token, &credential.refresh_token) {
            (Some(token), _) => token.clone(),
            (None, Some(refresh)) => {
                let app_key = app_key.ok_or_else(|| {
                    Error::Config(
                        "An app key is required to use a refresh token (set DROPMIRROR_APP_KEY)"
                            .into(),
                    )
                })?;
                let form = [
                    ("grant_type", "refresh_token"),
                    ("refresh_token", refresh.as_str()),
                    ("client_id", app_key),
                ];
                let token: TokenResponse = runtime.block_on(async {
                    let response = http
                        .post(format!("{API_URL}/oauth2/token"))
                        .form(&form)
                        .send()
                        .await?;
                    Ok::<_, Error>(check(response).await?.json().await?)
                })?;
                debug!(expires_in = ?token.expires_in, "Refreshed access token");
                token.access_token
            }
            (None, None) => {
                return Err(Error::Config("Stored login holds no token".into()));
            }
        };

        Ok(Self {
            runtime,
            http,
            access_token,
            api_url: API_URL.to_string(),
            content_url: CONTENT_URL.to_string(),
        })
    }

    async fn rpc<A: Serialize + Sync>(&self, endpoint: &str, arg: &A) -> Result<ListFolderResult> {
        let response = self
            .http
            .post(format!("{}/2/files/{endpoint}", self.api_url))
            .bearer_auth(&self.access_token)
            .json(arg)
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    async fn fetch(&self, remote_path: &str, dest: &Path) -> Result<()> {
        let arg = http_header_safe_json(&DownloadArg { path: remote_path })?;
        let response = self
            .http
            .post(format!("{}/2/files/download", self.content_url))
            .bearer_auth(&self.access_token)
            .header("Dropbox-API-Arg", arg)
            .send()
            .await?;
        let mut response = check(response).await?;

        let tmp = tmp_path(dest);
        let mut file = tokio::fs::File::create(&tmp).await?;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        drop(file);
        tokio::fs::rename(&tmp, dest).await?;
        Ok(())
    }
}

/// Serialize `arg` for an HTTP header: everything outside printable
/// ASCII is written as `\uXXXX` (surrogate pairs above U+FFFF).
fn http_header_safe_json<A: Serialize>(arg: &A) -> Result<String> {
    let json = serde_json::to_string(arg)?;
    let mut out = String::with_capacity(json.len());
    let mut units = [0u16; 2];
    for c in json.chars() {
        if c.is_ascii() && c != '\x7f' {
            out.push(c);
        } else {
            for unit in c.encode_utf16(&mut units) {
                out.push_str(&format!("\\u{unit:04x}"));
            }
        }
    }
    Ok(out)
}

fn tmp_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    dest.with_file_name(name)
}

impl RemoteStore for DropboxClient {
    fn list(&mut self, path: &str, cursor: Option<&str>) -> Result<ListPage> {
        let result = match cursor {
            Some(cursor) => self.runtime.block_on(
                self.rpc("list_folder/continue", &ListFolderContinueArg { cursor }),
            )?,
            None => {
                trace!(path, "list_folder");
                self.runtime.block_on(self.rpc(
                    "list_folder",
                    &ListFolderArg {
                        path,
                        recursive: false,
                        include_deleted: true,
                    },
                ))?
            }
        };

        Ok(ListPage {
            entries: result
                .entries
                .into_iter()
                .map(WireMetadata::into_entry)
                .collect(),
            cursor: Some(result.cursor),
            has_more: result.has_more,
        })
    }

    fn download(&mut self, remote_path: &str, dest: &Path) -> Result<()> {
        let result = self.runtime.block_on(self.fetch(remote_path, dest));
        if result.is_err() {
            let _ = std::fs::remove_file(tmp_path(dest));
        }
        result
    }
}
