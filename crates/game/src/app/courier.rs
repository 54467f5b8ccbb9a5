use courier_engine::WorldPos;

pub(crate) const STAMINA_MAX: f64 = 100.0;
const STAMINA_COST_PER_CELL: f64 = 0.5;
/// Below this the courier is tired; an exhausted courier must recover to it.
const STAMINA_TIRED_THRESHOLD: f64 = 30.0;
const RECOVERY_PER_SECOND: f64 = 5.0;
const HEAVY_RECOVERY_PER_SECOND: f64 = 3.0;
const HEAVY_LOAD_WEIGHT: f64 = 4.0;
const BASE_SPEED_CELLS_PER_SECOND: f64 = 3.0;
const ARRIVAL_THRESHOLD_CELLS: f64 = 0.05;

/// External movement modifier. The simulation only reads the multiplier.
pub(crate) trait WeatherEffect {
    fn condition(&self) -> &str;
    fn speed_multiplier(&self) -> f64;
}

#[derive(Debug, Clone)]
pub(crate) struct StaticWeather {
    condition: String,
    speed_multiplier: f64,
}

impl StaticWeather {
    pub(crate) fn new(condition: impl Into<String>, speed_multiplier: f64) -> Self {
        Self {
            condition: condition.into(),
            speed_multiplier,
        }
    }

    pub(crate) fn clear() -> Self {
        Self::new("clear", 1.0)
    }
}

impl WeatherEffect for StaticWeather {
    fn condition(&self) -> &str {
        &self.condition
    }

    fn speed_multiplier(&self) -> f64 {
        self.speed_multiplier
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Courier {
    pub(crate) position: WorldPos,
    stamina: f64,
    exhausted: bool,
}

impl Courier {
    pub(crate) fn new(position: WorldPos) -> Self {
        Self {
            position,
            stamina: STAMINA_MAX,
            exhausted: false,
        }
    }

    pub(crate) fn stamina(&self) -> f64 {
        self.stamina
    }

    pub(crate) fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub(crate) fn speed_multiplier(&self, carried_weight: f64, weather: &dyn WeatherEffect) -> f64 {
        let stamina_factor = if self.exhausted {
            0.0
        } else if self.stamina < STAMINA_TIRED_THRESHOLD {
            0.8
        } else {
            1.0
        };
        let load_factor = (1.0 - 0.03 * carried_weight).max(0.8);
        stamina_factor * load_factor * weather.speed_multiplier().max(0.0)
    }

    /// Moves toward `target` for one step, then recovers stamina. Returns
    /// true once the target is reached.
    pub(crate) fn advance(
        &mut self,
        target: Option<WorldPos>,
        dt_seconds: f64,
        carried_weight: f64,
        weather: &dyn WeatherEffect,
        tile_size: f64,
    ) -> bool {
        let mut arrived = false;
        if let Some(target) = target {
            let speed = BASE_SPEED_CELLS_PER_SECOND
                * tile_size
                * self.speed_multiplier(carried_weight, weather);
            let (next, reached) = step_toward(
                self.position,
                target,
                speed,
                dt_seconds,
                ARRIVAL_THRESHOLD_CELLS * tile_size,
            );
            let moved_cells = distance(self.position, next) / tile_size;
            if moved_cells > 0.0 {
                self.drain(moved_cells * STAMINA_COST_PER_CELL);
            }
            self.position = next;
            arrived = reached;
        }
        self.recover(dt_seconds, carried_weight);
        arrived
    }

    fn drain(&mut self, amount: f64) {
        self.stamina = (self.stamina - amount).max(0.0);
        if self.stamina <= 0.0 {
            self.exhausted = true;
        }
    }

    /// An exhausted courier only recovers up to the tired threshold, at full
    /// rate; otherwise recovery runs at half rate up to the maximum.
    fn recover(&mut self, dt_seconds: f64, carried_weight: f64) {
        let rate = if carried_weight > HEAVY_LOAD_WEIGHT {
            HEAVY_RECOVERY_PER_SECOND
        } else {
            RECOVERY_PER_SECOND
        };
        let amount = rate * dt_seconds.max(0.0);
        if self.exhausted {
            self.stamina = (self.stamina + amount).min(STAMINA_TIRED_THRESHOLD);
            if self.stamina >= STAMINA_TIRED_THRESHOLD {
                self.exhausted = false;
            }
        } else {
            self.stamina = (self.stamina + amount * 0.5).min(STAMINA_MAX);
        }
    }
}

pub(crate) fn step_toward(
    current: WorldPos,
    target: WorldPos,
    speed: f64,
    dt_seconds: f64,
    arrival_threshold: f64,
) -> (WorldPos, bool) {
    let dx = target.x - current.x;
    let dy = target.y - current.y;
    let distance_sq = dx * dx + dy * dy;
    if distance_sq <= arrival_threshold * arrival_threshold {
        return (target, true);
    }

    let distance = distance_sq.sqrt();
    let max_step = speed * dt_seconds;
    if max_step <= 0.0 {
        return (current, false);
    }
    if max_step >= distance {
        return (target, true);
    }

    let scale = max_step / distance;
    (
        WorldPos::new(current.x + dx * scale, current.y + dy * scale),
        false,
    )
}

fn distance(a: WorldPos, b: WorldPos) -> f64 {
    ((b.x - a.x).powi(2) + (b.y - a.y).powi(2)).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TILE: f64 = 25.0;

    #[test]
    fn step_toward_moves_by_speed_times_dt_without_overshoot() {
        let (next, arrived) = step_toward(
            WorldPos::new(0.0, 0.0),
            WorldPos::new(10.0, 0.0),
            2.0,
            0.5,
            0.1,
        );
        assert!(!arrived);
        assert!((next.x - 1.0).abs() < 0.0001);
        assert!(next.y.abs() < 0.0001);

        let (next, arrived) = step_toward(
            WorldPos::new(0.0, 0.0),
            WorldPos::new(0.05, 0.0),
            5.0,
            1.0 / 60.0,
            0.1,
        );
        assert!(arrived);
        assert_eq!(next, WorldPos::new(0.05, 0.0));
    }

    #[test]
    fn speed_combines_stamina_load_and_weather() {
        let mut courier = Courier::new(WorldPos::default());
        let clear = StaticWeather::clear();
        assert_eq!(courier.speed_multiplier(0.0, &clear), 1.0);
        assert!((courier.speed_multiplier(10.0, &clear) - 0.8).abs() < 1e-9);

        let rain = StaticWeather::new("rain", 0.5);
        assert_eq!(rain.condition(), "rain");
        courier.stamina = 20.0;
        assert!((courier.speed_multiplier(0.0, &rain) - 0.4).abs() < 1e-9);
    }

    #[test]
    fn exhaustion_stops_movement_until_recovered() {
        let clear = StaticWeather::clear();
        let mut courier = Courier::new(WorldPos::default());
        courier.stamina = 0.25;

        courier.advance(Some(WorldPos::new(10.0 * TILE, 0.0)), 1.0, 0.0, &clear, TILE);
        assert!(courier.is_exhausted());
        assert_eq!(courier.speed_multiplier(0.0, &clear), 0.0);

        let parked = courier.position;
        courier.advance(Some(WorldPos::new(10.0 * TILE, 0.0)), 2.0, 0.0, &clear, TILE);
        assert_eq!(courier.position, parked);
        assert!(courier.is_exhausted());

        for _ in 0..10 {
            courier.advance(None, 1.0, 0.0, &clear, TILE);
        }
        assert!(!courier.is_exhausted());
        assert!(courier.stamina() >= STAMINA_TIRED_THRESHOLD);
    }

    #[test]
    fn heavy_loads_recover_slower() {
        let clear = StaticWeather::clear();
        let mut light = Courier::new(WorldPos::default());
        let mut heavy = Courier::new(WorldPos::default());
        light.stamina = 50.0;
        heavy.stamina = 50.0;

        light.advance(None, 2.0, 1.0, &clear, TILE);
        heavy.advance(None, 2.0, 5.0, &clear, TILE);
        assert_eq!(light.stamina(), 55.0);
        assert_eq!(heavy.stamina(), 53.0);
    }
}
