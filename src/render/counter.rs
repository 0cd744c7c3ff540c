use log::info;
use parking_lot::Mutex;
use crate::geom::ray::RayCounter;

/// Total, extrema and mean of one counter field across the collected ring.
#[derive(Clone, Copy, Debug)]
pub struct FieldStats {
    pub total: u64,
    pub min: u64,
    pub max: u64,
    count: usize,
}

impl FieldStats {
    fn collect<I>(values: I) -> Self
    where I: Iterator<Item = u64> {
        let mut stats = FieldStats {
            total: 0,
            min: u64::MAX,
            max: 0,
            count: 0,
        };
        for v in values {
            stats.total += v;
            stats.min = stats.min.min(v);
            stats.max = stats.max.max(v);
            stats.count += 1;
        }
        stats
    }

    pub fn mean(&self) -> f64 {
        self.total as f64 / self.count as f64
    }
}

/// Aggregate over every published counter.
#[derive(Clone, Copy, Debug)]
pub struct RingStats {
    pub rays: usize,
    pub triangle_tests: FieldStats,
    pub box_tests: FieldStats,
    pub traversals: FieldStats,
    pub bounces: FieldStats,
}

/// Bounded, mutex-guarded collection of finished tile counters. A counter
/// stays owned by its tile until the tile completes and publishes it here;
/// the lock is held O(1) per publish. Once the capacity is reached, further
/// counters are dropped without notice.
pub struct CounterRing {
    counters: Mutex<Vec<RayCounter>>,
    capacity: usize,
}

impl CounterRing {
    pub fn new(capacity: usize) -> Self {
        CounterRing {
            counters: Mutex::new(Vec::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn push(&self, counter: RayCounter) {
        let mut counters = self.counters.lock();
        if counters.len() < self.capacity {
            counters.push(counter);
        }
    }

    pub fn len(&self) -> usize {
        self.counters.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.lock().is_empty()
    }

    /// Statistics over the filled prefix only, never the raw capacity.
    /// `None` until at least one counter was published.
    pub fn aggregate(&self) -> Option<RingStats> {
        let counters = self.counters.lock();
        if counters.is_empty() {
            return None;
        }
        Some(RingStats {
            rays: counters.len(),
            triangle_tests: FieldStats::collect(counters.iter().map(|c| c.triangle_tests)),
            box_tests: FieldStats::collect(counters.iter().map(|c| c.box_tests)),
            traversals: FieldStats::collect(counters.iter().map(|c| c.traversals)),
            bounces: FieldStats::collect(counters.iter().map(|c| c.bounces)),
        })
    }

    /// Dumps the aggregate to the log, one field block at a time.
    pub fn report(&self) {
        let Some(stats) = self.aggregate() else {
            return;
        };
        info!("{} rays fired.", stats.rays);
        for (name, field) in [
            ("TriangleTests", &stats.triangle_tests),
            ("BoxTests", &stats.box_tests),
            ("Traversals", &stats.traversals),
            ("Bounces", &stats.bounces),
        ] {
            info!("Total{}: {}", name, field.total);
            info!("Min{}: {}", name, field.min);
            info!("Max{}: {}", name, field.max);
            info!("Average{}: {:.2}", name, field.mean());
        }
    }
}
