//! View alignment for taxalign.
//!
//! Keeps N independently-rendered views of one merged tree in lock-step:
//! expanding or collapsing a node in one view applies the equivalent
//! operation to every other registered view, and selection is mirrored
//! through the same node mapping.
//!
//! Feedback loops between mutually triggering views are suppressed by an
//! explicit [`PropagationContext`] passed through the call chain: a request
//! arriving while a propagation is in flight is dropped, and the context is
//! released unconditionally when the top-level request completes. The
//! context only guards same-thread feedback; it is not a lock.
//!
//! View state lives in [`TreeViewState`] values addressed by integer ids;
//! the rendering toolkit is an external collaborator that paints from the
//! row queries and feeds input events back in.

pub mod alignment;
pub mod error;
pub mod selection;
pub mod token;
pub mod view;

pub use alignment::{AlignAction, AlignOutcome, AlignReport, AlignStep, AlignmentController};
pub use error::{AlignError, AlignResult};
pub use selection::{
    SelectionDelta, SelectionModel, SelectionOutcome, SelectionRequest, SelectionSynchronizer,
    SelectionTarget,
};
pub use token::PropagationContext;
pub use view::{Aligned, TreeViewState, ViewScope};
