use thiserror::Error;

use crate::ExportFormat;

/// Erreurs d'export. Toute erreur annule l'export entier ; aucun fichier
/// partiel n'est laissé sur le disque.
#[derive(Error, Debug)]
pub enum ExportError {
    /// Sequence vide : rejetée avant de toucher à l'encodeur.
    #[error("Aucune frame à exporter")]
    NoFrames,

    /// Format refusé par la sonde de capacités.
    #[error("Export {format} indisponible : {reason}")]
    Unsupported {
        /// Format demandé.
        format: ExportFormat,
        /// Raison lisible (encodeur manquant, ffmpeg absent...).
        reason: String,
    },

    /// Aucune police monospace utilisable pour la rasterisation.
    #[error("Aucune police monospace disponible (utiliser --font)")]
    FontUnavailable,

    /// L'encodeur a échoué en cours de route.
    #[error("Échec de l'encodeur : {0}")]
    Encoder(String),

    /// Erreur d'entrée/sortie (écriture, renommage).
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
