use std::time::{Duration, Instant};

/// Limiteur de cadence : une frame au plus toutes les `1 / cap` secondes.
///
/// # Example
/// ```
/// use am_render::fps::FrameLimiter;
/// use std::time::{Duration, Instant};
/// let mut limiter = FrameLimiter::new(10);
/// let t0 = Instant::now();
/// assert!(limiter.try_begin(t0));
/// assert!(!limiter.try_begin(t0 + Duration::from_millis(50)));
/// assert!(limiter.try_begin(t0 + Duration::from_millis(100)));
/// ```
pub struct FrameLimiter {
    period: Duration,
    last: Option<Instant>,
}

impl FrameLimiter {
    /// Limiteur à `cap` images par seconde (min 1).
    #[must_use]
    pub fn new(cap: u32) -> Self {
        Self {
            period: Self::period_for(cap),
            last: None,
        }
    }

    fn period_for(cap: u32) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(cap.max(1)))
    }

    /// Change le plafond (relu à chaque tick depuis les réglages).
    pub fn set_cap(&mut self, cap: u32) {
        self.period = Self::period_for(cap);
    }

    /// `true` si une frame peut être produite à `now` ; mémorise alors `now`.
    pub fn try_begin(&mut self, now: Instant) -> bool {
        match self.last {
            Some(last) if now.duration_since(last) < self.period => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }

    /// Temps restant avant la prochaine frame autorisée.
    #[must_use]
    pub fn remaining(&self, now: Instant) -> Duration {
        self.last
            .map_or(Duration::ZERO, |last| self.period.saturating_sub(now.duration_since(last)))
    }
}

/// Statistiques de rendu affichées dans le HUD. Jamais persistées.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RenderStats {
    /// Durée du dernier passage pipeline + rendu, arrondie au dixième de ms.
    pub render_ms: f64,
    /// Images par seconde mesurées sur la dernière fenêtre.
    pub fps: f64,
    pub source_width: u32,
    pub source_height: u32,
    pub cols: usize,
    pub rows: usize,
}

/// Agrège les frames et publie des [`RenderStats`] une fois par seconde.
///
/// # Example
/// ```
/// use am_render::fps::StatsMeter;
/// use std::time::{Duration, Instant};
/// let t0 = Instant::now();
/// let mut meter = StatsMeter::new(t0);
/// assert!(meter.record(t0 + Duration::from_millis(500), 2.04, (640, 360), (120, 37)).is_none());
/// let stats = meter.record(t0 + Duration::from_secs(1), 2.04, (640, 360), (120, 37)).unwrap();
/// assert_eq!(stats.fps, 2.0);
/// assert_eq!(stats.render_ms, 2.0);
/// ```
pub struct StatsMeter {
    window_start: Instant,
    frames: u32,
    latest: RenderStats,
}

impl StatsMeter {
    /// Fenêtre ouverte à `now`.
    #[must_use]
    pub fn new(now: Instant) -> Self {
        Self {
            window_start: now,
            frames: 0,
            latest: RenderStats::default(),
        }
    }

    /// Enregistre une frame. Retourne de nouvelles stats quand la fenêtre
    /// d'une seconde est écoulée.
    pub fn record(
        &mut self,
        now: Instant,
        render_ms: f64,
        source: (u32, u32),
        grid: (usize, usize),
    ) -> Option<RenderStats> {
        self.frames += 1;
        let elapsed = now.duration_since(self.window_start).as_secs_f64();
        if elapsed < 1.0 {
            return None;
        }
        self.latest = RenderStats {
            render_ms: (render_ms * 10.0).round() / 10.0,
            fps: (f64::from(self.frames) / elapsed).round(),
            source_width: source.0,
            source_height: source.1,
            cols: grid.0,
            rows: grid.1,
        };
        self.frames = 0;
        self.window_start = now;
        Some(self.latest)
    }

    /// Dernières stats publiées.
    #[must_use]
    pub fn latest(&self) -> RenderStats {
        self.latest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remaining_counts_down() {
        let mut limiter = FrameLimiter::new(4);
        let t0 = Instant::now();
        assert_eq!(limiter.remaining(t0), Duration::ZERO);
        assert!(limiter.try_begin(t0));
        assert_eq!(
            limiter.remaining(t0 + Duration::from_millis(100)),
            Duration::from_millis(150)
        );
        assert_eq!(limiter.remaining(t0 + Duration::from_secs(1)), Duration::ZERO);
    }

    #[test]
    fn cap_change_takes_effect() {
        let mut limiter = FrameLimiter::new(1);
        let t0 = Instant::now();
        assert!(limiter.try_begin(t0));
        assert!(!limiter.try_begin(t0 + Duration::from_millis(100)));
        limiter.set_cap(60);
        assert!(limiter.try_begin(t0 + Duration::from_millis(100)));
    }

    #[test]
    fn stats_window_resets() {
        let t0 = Instant::now();
        let mut meter = StatsMeter::new(t0);
        for i in 1..=29 {
            let _ = meter.record(t0 + Duration::from_millis(i * 33), 5.0, (1, 1), (1, 1));
        }
        let s = meter.record(t0 + Duration::from_millis(1000), 5.0, (1920, 1080), (120, 37));
        assert_eq!(s.map(|s| s.fps), Some(30.0));
        assert_eq!(meter.latest().rows, 37);
        assert!(
            meter
                .record(t0 + Duration::from_millis(1100), 5.0, (1, 1), (1, 1))
                .is_none()
        );
    }
}
