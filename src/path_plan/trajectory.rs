//! Cubic joint space trajectory between two knot points with zero velocity at both ends.

use std::time::Duration;

/// Cubic `w(t) = w0 + w1 t + w2 t² + w3 t³` with `w(0) = p0`, `w(T) = p1` and zero
/// velocity at both ends (so `w1` is always zero). Time is in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubicSegment {
    w0: f64,
    w2: f64,
    w3: f64,
    end: f64,
    duration: f64,
}

impl CubicSegment {
    /// Returns None if the duration is zero, there is no cubic that gets anywhere in no time.
    pub fn new(p0: f64, p1: f64, duration: Duration) -> Option<Self> {
        let t = duration.as_secs_f64();
        if !(t > 0.0) {
            return None;
        }
        let delta = p1 - p0;
        Some(CubicSegment {
            w0: p0,
            w2: 3.0 * delta / (t * t),
            w3: -2.0 * delta / (t * t * t),
            end: p1,
            duration: t,
        })
    }

    pub fn start(&self) -> f64 {
        self.w0
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.duration)
    }

    /// Position at the given time. Times past the end give the end position.
    pub fn position(&self, t: Duration) -> f64 {
        let t = t.as_secs_f64();
        if t >= self.duration {
            return self.end;
        }
        self.w0 + self.w2 * t * t + self.w3 * t * t * t
    }

    /// Velocity (units per second) at the given time.
    pub fn velocity(&self, t: Duration) -> f64 {
        let t = t.as_secs_f64();
        if t >= self.duration {
            return 0.0;
        }
        2.0 * self.w2 * t + 3.0 * self.w3 * t * t
    }
}

/// Raw positions for the joints of a motion, as (joint index, position).
pub type Targets = Vec<(usize, u16)>;

/// What to send to the actuators at some moment of a trajectory.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Intermediate sample. More will follow.
    Sample(Targets),
    /// The exact end positions. The trajectory is complete once these are sent.
    Final(Targets),
}

/// All joints of one motion. They share the same duration and are sampled together.
#[derive(Debug, Clone)]
pub struct Trajectory {
    joints: Vec<(usize, CubicSegment)>,
    targets: Targets,
    duration: Duration,
    period: Duration,
}

impl Trajectory {
    /// Trajectory moving each (joint, from, to) triple over the same duration, sampled with
    /// the given period. None if the duration or period is zero.
    pub fn new(moves: &[(usize, u16, u16)], duration: Duration, period: Duration) -> Option<Self> {
        if period.is_zero() {
            return None;
        }
        let joints = moves
            .iter()
            .map(|&(joint, from, to)| {
                CubicSegment::new(from as f64, to as f64, duration).map(|segment| (joint, segment))
            })
            .collect::<Option<Vec<_>>>()?;
        let targets = moves.iter().map(|&(joint, _, to)| (joint, to)).collect();
        Some(Trajectory { joints, targets, duration, period })
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn targets(&self) -> &Targets {
        &self.targets
    }

    /// Rounded positions of all joints at the given time since start.
    pub fn sample(&self, t: Duration) -> Targets {
        self.joints
            .iter()
            .map(|(joint, segment)| (*joint, segment.position(t).round() as u16))
            .collect()
    }

    /// What to send when the given time has elapsed since the motion started.
    pub fn step(&self, elapsed: Duration) -> Step {
        if elapsed < self.duration {
            Step::Sample(self.sample(elapsed))
        } else {
            Step::Final(self.targets.clone())
        }
    }

    /// The complete schedule on an ideal clock: samples at `0, period, 2 period, ...` while
    /// before the end, then the final exact positions. Can be iterated any number of times.
    pub fn samples(&self) -> impl Iterator<Item = Step> + '_ {
        let ticks = self.duration.as_nanos().div_ceil(self.period.as_nanos());
        (0..ticks)
            .map(move |tick| Step::Sample(self.sample(self.tick_time(tick))))
            .chain(std::iter::once(Step::Final(self.targets.clone())))
    }

    /// Time of the given sample. Only called for ticks before the end, so the result is
    /// below the duration and fits.
    fn tick_time(&self, tick: u128) -> Duration {
        let nanos = self.period.as_nanos() * tick;
        Duration::new((nanos / 1_000_000_000) as u64, (nanos % 1_000_000_000) as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PERIOD: Duration = Duration::from_millis(10);

    #[test]
    fn test_boundary_conditions() {
        let duration = Duration::from_millis(1500);
        let segment = CubicSegment::new(1000.0, 3000.0, duration).unwrap();
        assert_eq!(segment.position(Duration::ZERO), 1000.0);
        assert!((segment.position(duration - Duration::from_nanos(1)) - 3000.0).abs() < 1e-3);
        assert_eq!(segment.position(duration), 3000.0);
        assert_eq!(segment.velocity(Duration::ZERO), 0.0);
        assert!(segment.velocity(duration - Duration::from_nanos(1)).abs() < 1e-3);
        // Symmetric: half way in the middle, fastest there
        let half = segment.position(duration / 2);
        assert!((half - 2000.0).abs() < 1e-9);
        assert!(segment.velocity(duration / 2) > segment.velocity(duration / 4));
    }

    #[test]
    fn test_monotonic() {
        let segment = CubicSegment::new(600.0, 100.0, Duration::from_secs(2)).unwrap();
        let mut previous = segment.position(Duration::ZERO);
        for ms in (0..=2000).step_by(5) {
            let p = segment.position(Duration::from_millis(ms));
            assert!(p <= previous + 1e-9);
            assert!(p >= 100.0 && p <= 600.0);
            previous = p;
        }
    }

    #[test]
    fn test_zero_duration() {
        assert!(CubicSegment::new(0.0, 1.0, Duration::ZERO).is_none());
        assert!(Trajectory::new(&[(0, 1, 2)], Duration::ZERO, PERIOD).is_none());
        assert!(Trajectory::new(&[(0, 1, 2)], Duration::from_secs(1), Duration::ZERO).is_none());
    }

    #[test]
    fn test_samples() {
        let trajectory = Trajectory::new(
            &[(0, 2048, 3048), (4, 512, 412)],
            Duration::from_millis(95),
            PERIOD,
        )
        .unwrap();
        let steps: Vec<Step> = trajectory.samples().collect();

        // 0, 10, .. 90 ms, then the final write
        assert_eq!(steps.len(), 11);
        assert_eq!(steps[0], Step::Sample(vec![(0, 2048), (4, 512)]));
        assert_eq!(steps[10], Step::Final(vec![(0, 3048), (4, 412)]));
        for step in &steps[1..10] {
            match step {
                Step::Sample(targets) => {
                    assert!(targets[0].1 > 2048 && targets[0].1 < 3048);
                    assert!(targets[1].1 < 512 && targets[1].1 > 412);
                }
                Step::Final(_) => panic!("Final step too early"),
            }
        }

        // Restartable
        let again: Vec<Step> = trajectory.samples().collect();
        assert_eq!(steps, again);
    }

    #[test]
    fn test_samples_on_period_boundary() {
        let trajectory = Trajectory::new(&[(1, 0, 100)], Duration::from_millis(100), PERIOD).unwrap();
        // t = 100 ms is not before the end, so only 0..90 are sampled
        assert_eq!(trajectory.samples().count(), 11);
    }

    #[test]
    fn test_step() {
        let trajectory =
            Trajectory::new(&[(2, 100, 200)], Duration::from_millis(40), PERIOD).unwrap();
        assert_eq!(trajectory.step(Duration::ZERO), Step::Sample(vec![(2, 100)]));
        assert_eq!(trajectory.step(Duration::from_millis(20)), Step::Sample(vec![(2, 150)]));
        assert_eq!(trajectory.step(Duration::from_millis(40)), Step::Final(vec![(2, 200)]));
        assert_eq!(trajectory.step(Duration::from_secs(7)), Step::Final(vec![(2, 200)]));
    }

    #[test]
    fn test_tick_time_beyond_u32() {
        // Ten billion samples, more ticks than u32 can count
        let duration = Duration::from_secs(10_000_000);
        let trajectory = Trajectory::new(&[(0, 0, 4095)], duration, Duration::from_millis(1)).unwrap();
        let tick = 5_000_000_000u128;
        assert!(tick > u32::MAX as u128);
        assert_eq!(trajectory.tick_time(tick), Duration::from_secs(5_000_000));
        assert_eq!(trajectory.tick_time(3), Duration::from_millis(3));
        assert!(trajectory.tick_time(9_999_999_999) < duration);
    }

    #[test]
    fn test_no_motion() {
        let trajectory =
            Trajectory::new(&[(3, 700, 700)], Duration::from_millis(30), PERIOD).unwrap();
        for step in trajectory.samples() {
            match step {
                Step::Sample(targets) | Step::Final(targets) => assert_eq!(targets, vec![(3, 700)]),
            }
        }
    }
}
