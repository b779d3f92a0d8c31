//! Platform adapters for display enumeration and the touch driver.
//!
//! Only the in-memory [`mock::MockPlatform`] lives here for now.  It stands
//! in for both the OS display list and the HID touch driver, which lets the
//! demo binary and the tests drive the coordinator without hardware.

pub mod mock;
