pub use crate::config::GovernorConfig;
pub use crate::dispatch::{Dispatcher, PassQueue, ScheduleResult, Trigger};
pub use crate::engine::{PassOutcome, Reconciler};
pub use crate::error::{GovernorError, GovernorResult, Transition};
pub use crate::governor::Governor;
pub use crate::platform::{CoreControl, SimulatedCores, SysfsCores};
pub use crate::state::{StateEvent, StateNotifier, StateSource};
pub use crate::target::{SUSPEND_FLOOR, compute_target};
pub use crate::tunables::Tunables;
