//! Penumbra Core
//!
//! Foundational types shared by every Penumbra crate:
//!
//! - [`errors`]: the engine-wide [`RenderError`] taxonomy and [`Result`] alias
//! - [`handle`]: typed, monotonically issued integer handles with an invalid sentinel

pub mod errors;
pub mod handle;

pub use errors::{RenderError, Result};
pub use handle::{Handle, HandleAllocator};
