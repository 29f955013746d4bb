//! Device lifecycle: resets and stored-layout housekeeping.
//!
//! # Available Utilities
//!
//! - **[`reset`]**: delayed reboot / full reset on a single task handle, and
//!   the immediate full reset used for fatal configuration errors
//! - **[`migrations`]**: NV layout version and device role checks run at boot
//!
//! # Usage
//!
//! ```rust
//! use zbswitch::hal::{Scheduler, System, TaskId};
//! use zbswitch::storage::MemoryStore;
//! use zbswitch::system::reset::{ResetKind, ResetScheduler};
//!
//! # #[derive(Default)]
//! # struct Board { reboots: u32 }
//! # impl Scheduler for Board {
//! #     fn schedule(&mut self, _task: TaskId, _delay_ms: u16) {}
//! #     fn unschedule(&mut self, _task: TaskId) {}
//! # }
//! # impl System for Board {
//! #     fn factory_reset(&mut self) {}
//! #     fn system_reset(&mut self) { self.reboots += 1; }
//! # }
//! let mut board = Board::default();
//! let mut store: MemoryStore<4, 16> = MemoryStore::new();
//! let mut resets = ResetScheduler::new();
//!
//! resets.schedule_reboot(&mut board, 0);
//! assert_eq!(resets.pending(), Some(ResetKind::Reboot));
//!
//! // Later, when TaskId::Reset fires:
//! resets.on_reset_task(&mut board, &mut store);
//! assert_eq!(board.reboots, 1);
//! ```

/// Delayed and immediate resets.
pub mod reset;

/// Boot-time checks of stored layout version and device role.
pub mod migrations;
