//! Mirror command implementation.

use tracing::{info, trace};

use super::login::{self, LoginRequest};
use crate::cli::Cli;
use crate::config::MirrorConfig;
use crate::error::Result;
use crate::mirror::{Mirror, MirrorStats};
use crate::remote::dropbox::DropboxClient;
use crate::remote::RemoteStore;
use crate::storage::{MetaStore, RecordQuery};

/// Execute a mirror run.
///
/// # Errors
///
/// Returns an error if configuration, login, or the run itself fails.
pub fn execute(cli: &Cli) -> Result<()> {
    let config = MirrorConfig::from_cli(cli)?;

    std::fs::create_dir_all(&config.local_root)?;
    let store = MetaStore::open(&config.metadb_path, config.reset_meta)?;

    let request = LoginRequest {
        interactive: cli.login,
        token: cli.token.as_deref(),
        app_key: config.app_key.as_deref(),
        timeout: config.timeout,
    };
    let credential = login::execute(&store, &request, &config.local_root)?;
    let mut remote = DropboxClient::connect(&credential, config.app_key.as_deref(), config.timeout)?;

    run(&mut remote, &store, &config)?;
    Ok(())
}

/// Mirror `config`'s remote root into its local root as one transaction.
///
/// With pruning enabled, records this run did not touch are removed
/// afterwards (skipped for dry and structure-only runs, which do not
/// touch every record).
///
/// # Errors
///
/// Returns the first fatal error; the store is then left as it was.
pub fn run<R: RemoteStore + ?Sized>(remote: &mut R, store: &MetaStore, config: &MirrorConfig) -> Result<MirrorStats> {
    for (kind, pattern) in config.filter.patterns() {
        trace!("{kind}: {pattern}");
    }

    let options = &config.options;
    let stats = store.run(|store| {
        let stats = Mirror::new(
            remote,
            store,
            &config.local_root,
            &config.remote_root,
            &config.filter,
            options,
        )
        .run()?;

        if config.prune && !options.dry_run && !options.dir_only {
            let pruned = store.remove(&RecordQuery::all().synced_before(options.sync_ts))?;
            info!(pruned, "Pruned records not seen by this run");
        }
        Ok(stats)
    })?;

    info!(
        downloads = stats.downloads,
        removed = stats.removed,
        dirs_created = stats.dirs_created,
        "Mirror complete"
    );
    let summary = serde_json::to_string(&stats)?;
    trace!(stats = %summary, "Run statistics");
    Ok(stats)
}
