use std::io::Write;

use crate::error::AudioError;

/// Son joué à l'arrivée de nouvelles notifications.
pub trait AudioCue: Send + Sync {
    /// # Errors
    ///
    /// Retourne une erreur si aucune sortie n'est disponible ou si la lecture échoue.
    fn play(&self) -> Result<(), AudioError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Silent;

impl AudioCue for Silent {
    fn play(&self) -> Result<(), AudioError> {
        Err(AudioError::Unavailable)
    }
}

/// Fait sonner la cloche du terminal sur stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalBell;

impl AudioCue for TerminalBell {
    fn play(&self) -> Result<(), AudioError> {
        let mut stderr = std::io::stderr().lock();
        stderr
            .write_all(b"\x07")
            .and_then(|()| stderr.flush())
            .map_err(|source| AudioError::Playback { source })
    }
}
