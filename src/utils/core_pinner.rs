use core_affinity::{CoreId, get_core_ids, set_for_current};

/// Pins the calling thread to `core_id`.
///
/// The helper worker is pinned to a core that never goes offline (normally
/// the boot core), so parking cores cannot migrate it mid-pass.
pub fn try_pin_core(core_id: usize) -> anyhow::Result<usize> {
    if let Some(core_ids) = get_core_ids()
        && core_ids.iter().any(|c| c.id == core_id)
        && set_for_current(CoreId { id: core_id })
    {
        return Ok(core_id);
    }
    Err(anyhow::anyhow!("failed to pin core {core_id}"))
}
