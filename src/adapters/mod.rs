//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements  | Connects to               |
//! |------------|-------------|---------------------------|
//! | `log_sink` | EventSink   | `log` facade              |
//! | `memory`   | StoragePort | in-process `HashMap`      |
//! | `time`     | Clock       | system wall clock         |

pub mod log_sink;
pub mod memory;
pub mod time;
