//! Secure find-min / find-max over a shared array.
//!
//! Every participant first copies `arr[first]` into the running value and builds a trivial
//! constant share of `first` for the running index. The initiator then walks the array: per
//! position three waves run, each all-parallel — compare + value delta + index delta, then the
//! two scalings by the comparison bit, then the two in-place additions that fold the winner
//! into the running value and index. A single-element range completes right after the copy
//! wave without ever touching the comparison path.

pub mod state;

pub use state::{Direction, ExtremumState};

use crate::{comparison, linear, message::ProtocolType, multiplication, runtime::ProtocolManager};

/// Register the extremum responder factories and every protocol the scan composes.
pub fn register(manager: &mut ProtocolManager) {
    manager.register_responder(ProtocolType::SecureFindMin, state::build_responder);
    manager.register_responder(ProtocolType::SecureFindMax, state::build_responder);
    comparison::register(manager);
    linear::register(manager);
    multiplication::register(manager);
}
