//! Moving strings into guest memory through the guest's own allocator.

use tracing::debug;

use crate::codec;
use crate::error::{HostError, Result};
use crate::guest::GuestInstance;
use crate::offset::GuestOffset;

/// Encode `text`, reserve room for it with the guest's `allocate`, and copy
/// the code units in little-endian order.
///
/// Exactly `2 * units` bytes are requested and written. When the instance
/// was configured with terminated strings, two more bytes are requested and
/// a zero code unit follows the text.
pub fn write_string_to_guest(guest: &mut GuestInstance, text: &str) -> Result<GuestOffset> {
    let units = codec::encode_string(text);
    let payload = codec::encoded_byte_len(&units);
    let size = if guest.terminate_strings() {
        payload + 2
    } else {
        payload
    };

    let requested = i32::try_from(size).map_err(|_| HostError::Allocation {
        size,
        reason: "size does not fit in a 32-bit guest".to_string(),
    })?;
    let raw = guest
        .raw_allocate(requested)
        .map_err(|err| HostError::Allocation {
            size,
            reason: format!("{err:#}"),
        })?;
    let offset = GuestOffset::from_guest(raw).ok_or_else(|| HostError::Allocation {
        size,
        reason: format!("allocate returned {raw}, which is not a guest offset"),
    })?;

    // allocate may have grown memory, so the view is taken only now.
    let start = offset.as_usize();
    let end = start.checked_add(size).unwrap_or(usize::MAX);
    let view = guest.memory_view_mut();
    let memory_len = view.len();
    let Some(region) = view.get_mut(start..end) else {
        return Err(HostError::Allocation {
            size,
            reason: format!("region at {offset} exceeds guest memory of {memory_len} bytes"),
        });
    };

    codec::write_units(region, &units);
    if size > payload {
        region[payload..].fill(0);
    }

    debug!(%offset, size, "wrote string into guest memory");
    Ok(offset)
}

/// Release a region obtained from [`write_string_to_guest`] (or handed out
/// by the guest). The offset is consumed and must not be read again.
pub fn free_guest(guest: &mut GuestInstance, offset: GuestOffset) -> Result<()> {
    guest
        .raw_deallocate(offset.to_guest())
        .map_err(|err| HostError::Deallocation {
            offset: offset.get(),
            reason: format!("{err:#}"),
        })?;
    debug!(%offset, "released guest memory");
    Ok(())
}
