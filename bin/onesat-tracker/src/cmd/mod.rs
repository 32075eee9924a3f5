use argh::FromArgs;
use pending::PendingArgs;
use status::StatusArgs;
use track::TrackArgs;
use watch::WatchArgs;

pub mod pending;
pub mod status;
pub mod track;
pub mod watch;

#[derive(FromArgs, PartialEq, Debug, Clone)]
#[argh(subcommand)]
pub enum Commands {
    Track(TrackArgs),
    Watch(WatchArgs),
    Status(StatusArgs),
    Pending(PendingArgs),
}
