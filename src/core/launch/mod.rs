pub mod arguments;
pub mod classpath;
pub mod crash;
pub mod natives;
pub mod protocol;
pub mod task;

pub use arguments::{
    merge_legacy_arguments, standard_placeholders, substitute_placeholders, DisplayMode,
    DockIdentity, LaunchArgumentBuilder,
};
pub use classpath::{classpath_entries, render_classpath};
pub use crash::{CrashReport, CrashReporter, LogCrashReporter, CRASH_MARKER};
pub use natives::extract_natives;
pub use protocol::{ProtocolCall, ProtocolFunction, ProtocolHandler, ProtocolReplier, ProtocolReply};
pub use task::{spawn_game, supervise, GameCommand, GameObservers};
