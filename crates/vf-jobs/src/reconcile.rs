//! Recovery sweep for work lost with a stopped coordinator.

use vf_core::{ResizeState, Result};
use vf_db::VideoStore;

/// What [`reconcile_interrupted`] changed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileReport {
    pub videos_scanned: usize,
    pub resizes_failed: usize,
    pub audio_cleared: usize,
}

/// Mark every in-flight resize as failed and clear every in-flight audio
/// extraction, so users can request them again.
///
/// The job queue lives in the coordinator's memory. Run this only while no
/// coordinator is running, otherwise live jobs are marked failed too.
pub fn reconcile_interrupted(store: &VideoStore) -> Result<ReconcileReport> {
    let mut report = ReconcileReport::default();

    for video_id in store.all_ids()? {
        report.videos_scanned += 1;

        let reset = store.update(&video_id, |record| {
            let mut resizes = 0;
            for state in record.resizes.values_mut() {
                if state.processing {
                    *state = ResizeState::FAILED;
                    resizes += 1;
                }
            }
            let audio = std::mem::take(&mut record.audio_processing);
            Ok((resizes, usize::from(audio)))
        });
        let (resizes, audio) = match reset {
            Ok(counts) => counts,
            Err(e) if e.is_not_found() => continue,
            Err(e) => return Err(e),
        };

        if resizes > 0 || audio > 0 {
            tracing::info!(video_id = %video_id, resizes, audio, "Reset interrupted work");
        }
        report.resizes_failed += resizes;
        report.audio_cleared += audio;
    }

    Ok(report)
}
