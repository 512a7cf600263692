use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser};
use humantime::parse_duration;
use notifeed::types::KindFilter;

#[allow(clippy::struct_excessive_bools)]
#[derive(Parser, Debug)]
#[command(author, version, about = "Notification feed for the property dashboard", long_about = None)]
pub struct Cli {
    /// Chemin du fichier de configuration TOML.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Exécute un seul cycle de fusion, affiche la feed puis quitte.
    #[arg(long, action = ArgAction::SetTrue)]
    pub once: bool,

    /// Force l'intervalle de poll (ex. "30s").
    #[arg(long, value_parser = parse_duration)]
    pub interval: Option<Duration>,

    /// Force le répertoire de stockage.
    #[arg(long, value_name = "DIR")]
    pub store_dir: Option<PathBuf>,

    /// N'affiche qu'un type : all, maintenance, schedule ou system.
    #[arg(long, value_name = "TYPE")]
    pub filter: Option<KindFilter>,

    /// Marque toutes les notifications comme lues.
    #[arg(long, action = ArgAction::SetTrue)]
    pub mark_all_read: bool,

    /// Retire une notification par id (répétable).
    #[arg(long, value_name = "ID")]
    pub dismiss: Vec<String>,

    /// Supprime toutes les notifications.
    #[arg(long, action = ArgAction::SetTrue)]
    pub clear_all: bool,

    /// Stockage en mémoire ; logue les toasts au lieu de les afficher.
    #[arg(long, action = ArgAction::SetTrue)]
    pub dry_run: bool,

    /// Utilise un layer JSON pour les logs (`--features json-logs`).
    #[arg(long, action = ArgAction::SetTrue)]
    pub json_logs: bool,

    /// Filtre de logs explicite (ex. "notifeed=debug").
    #[arg(long, value_name = "FILTER")]
    pub log_filter: Option<String>,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn has_actions(&self) -> bool {
        self.mark_all_read || self.clear_all || !self.dismiss.is_empty()
    }
}
