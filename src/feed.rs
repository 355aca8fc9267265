use std::sync::mpsc::{Receiver, Sender};
use std::thread;

use anyhow::anyhow;

use crate::api_fetch;
use crate::state::{Delta, ProviderCommand};

/// Live provider: drains commands and answers each phase with a single
/// delta. The two requests of a phase fan out on threads and join before
/// anything is sent, so collections only ever replace together. Each sport
/// fetch runs on its own worker; nothing is cancelled, stale responses are
/// discarded when the delta is applied.
pub fn spawn_provider(tx: Sender<Delta>, cmd_rx: Receiver<ProviderCommand>) {
    thread::spawn(move || {
        for cmd in cmd_rx {
            match cmd {
                ProviderCommand::FetchInitial => {
                    let tx = tx.clone();
                    thread::spawn(move || {
                        let sports_handle = thread::spawn(api_fetch::fetch_sports);
                        let regions = api_fetch::fetch_regions();
                        let sports = join_worker(sports_handle, "sports");
                        match (sports, regions) {
                            (Ok(sports), Ok(regions)) => {
                                let _ = tx.send(Delta::SetInitial { sports, regions });
                            }
                            (Err(err), _) | (_, Err(err)) => {
                                let _ = tx.send(Delta::InitialFailed {
                                    error: format!("{err:#}"),
                                });
                            }
                        }
                    });
                }
                ProviderCommand::FetchSportData { sport, top_n } => {
                    let tx = tx.clone();
                    thread::spawn(move || {
                        let metrics_handle = {
                            let sport = sport.clone();
                            thread::spawn(move || api_fetch::fetch_metrics(&sport))
                        };
                        let rank = api_fetch::fetch_rank(&sport, top_n);
                        let metrics = join_worker(metrics_handle, "metrics");
                        match (metrics, rank) {
                            (Ok(metrics), Ok(rank)) => {
                                let _ = tx.send(Delta::SetSportData {
                                    sport,
                                    metrics,
                                    rank,
                                });
                            }
                            (Err(err), _) | (_, Err(err)) => {
                                let _ = tx.send(Delta::SportDataFailed {
                                    sport,
                                    error: format!("{err:#}"),
                                });
                            }
                        }
                    });
                }
            }
        }
    });
}

fn join_worker<T>(
    handle: thread::JoinHandle<anyhow::Result<Vec<T>>>,
    what: &str,
) -> anyhow::Result<Vec<T>> {
    match handle.join() {
        Ok(result) => result,
        Err(_) => Err(anyhow!("{what} fetch worker panicked")),
    }
}
