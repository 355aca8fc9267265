use std::sync::mpsc::{Receiver, Sender};
use std::thread;
use std::time::Duration;

use rand::Rng;

use crate::state::{Delta, Metric, ProviderCommand, RankEntry, Region, Sport};

const FETCH_DELAY: Duration = Duration::from_millis(350);

/// Demo provider (`SPOMAP_FEED=demo`): same command/delta contract as the
/// live feed, served from seeded data so the dashboard works offline.
pub fn spawn_fake_provider(tx: Sender<Delta>, cmd_rx: Receiver<ProviderCommand>) {
    thread::spawn(move || {
        for cmd in cmd_rx {
            let tx = tx.clone();
            thread::spawn(move || {
                // Enough latency to make the loading overlay visible.
                thread::sleep(FETCH_DELAY);
                match cmd {
                    ProviderCommand::FetchInitial => {
                        let _ = tx.send(Delta::SetInitial {
                            sports: seed_sports(),
                            regions: seed_regions(),
                        });
                    }
                    ProviderCommand::FetchSportData { sport, top_n } => {
                        let regions = seed_regions();
                        let mut rng = rand::thread_rng();
                        let metrics = demo_metrics(&sport, &regions, &mut rng);
                        let rank = demo_rank(&metrics, &regions, top_n);
                        let _ = tx.send(Delta::SetSportData {
                            sport,
                            metrics,
                            rank,
                        });
                    }
                }
            });
        }
    });
}

pub fn seed_sports() -> Vec<Sport> {
    [
        ("soccer", "Soccer"),
        ("swimming", "Swimming"),
        ("basketball", "Basketball"),
        ("badminton", "Badminton"),
        ("table_tennis", "Table Tennis"),
    ]
    .into_iter()
    .map(|(code, label)| Sport {
        code: code.to_string(),
        label: label.to_string(),
    })
    .collect()
}

pub fn seed_regions() -> Vec<Region> {
    [
        ("seoul", "Seoul", 37.57, 126.98),
        ("busan", "Busan", 35.18, 129.08),
        ("incheon", "Incheon", 37.46, 126.71),
        ("daegu", "Daegu", 35.87, 128.60),
        ("daejeon", "Daejeon", 36.35, 127.38),
        ("gwangju", "Gwangju", 35.16, 126.85),
        ("suwon", "Suwon", 37.26, 127.03),
        ("ulsan", "Ulsan", 35.54, 129.31),
        ("jeonju", "Jeonju", 35.82, 127.15),
        ("changwon", "Changwon", 35.23, 128.68),
        ("cheongju", "Cheongju", 36.64, 127.49),
        ("jeju", "Jeju", 33.50, 126.53),
    ]
    .into_iter()
    .map(|(id, name, lat, lng)| Region {
        id: id.to_string(),
        name: name.to_string(),
        lat,
        lng,
    })
    .collect()
}

/// Synthetic per-sport metrics. Demand and supply jitter per load, the EDI
/// is always their exact difference.
pub fn demo_metrics(sport: &str, regions: &[Region], rng: &mut impl Rng) -> Vec<Metric> {
    let sport_shift = (sport.len() % 5) as f64 * 4.0;
    regions
        .iter()
        .map(|region| {
            let demand = round1(25.0 + sport_shift + rng.gen_range(0.0..55.0));
            let supply = round1(20.0 + rng.gen_range(0.0..60.0));
            Metric {
                region_id: region.id.clone(),
                demand_score: demand,
                supply_score: supply,
                edi: demand - supply,
            }
        })
        .collect()
}

/// Rank list the way the backend produces it: descending EDI, truncated,
/// denormalized with the region name.
pub fn demo_rank(metrics: &[Metric], regions: &[Region], top_n: usize) -> Vec<RankEntry> {
    let mut sorted: Vec<&Metric> = metrics.iter().collect();
    sorted.sort_by(|a, b| {
        b.edi
            .partial_cmp(&a.edi)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    sorted
        .into_iter()
        .take(top_n.max(1))
        .map(|metric| {
            let region_name = regions
                .iter()
                .find(|r| r.id == metric.region_id)
                .map(|r| r.name.clone())
                .unwrap_or_else(|| metric.region_id.clone());
            RankEntry {
                region_id: metric.region_id.clone(),
                region_name,
                demand_score: metric.demand_score,
                supply_score: metric.supply_score,
                edi: metric.edi,
            }
        })
        .collect()
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
