//! Quantity trait and related types.
//!
//! A [`Quantity`] is data attached to a structure, such as per-cell detector
//! counts or visibility flags.

use std::any::Any;

/// Data associated with a structure that can be visualized.
pub trait Quantity: Send + Sync {
    /// Returns a reference to self as `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Returns a mutable reference to self as `Any` for downcasting.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Returns the name of this quantity.
    fn name(&self) -> &str;

    /// Returns the name of the parent structure.
    fn structure_name(&self) -> &str;

    /// Returns whether this quantity is currently enabled/visible.
    fn is_enabled(&self) -> bool;

    /// Sets the enabled state of this quantity.
    fn set_enabled(&mut self, enabled: bool);

    /// Returns the number of data elements.
    fn data_size(&self) -> usize;
}
