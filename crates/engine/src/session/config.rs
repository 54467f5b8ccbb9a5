/// Tunables for offer emission, proximity and the reputation economy.
#[derive(Debug, Clone, PartialEq)]
pub struct JobLogicConfig {
    /// World units per grid cell.
    pub tile_size: f64,
    pub offer_interval_seconds: f64,
    /// Emission timer value after a reset; the first offer appears after
    /// `offer_interval_seconds - initial_offer_timer_seconds`.
    pub initial_offer_timer_seconds: f64,
    pub offer_ttl_seconds: f64,
    pub delivery_window_seconds: f64,
    pub max_active_offers: usize,
    pub pickup_radius_cells: u32,
    pub dropoff_radius_cells: u32,
    pub weight_capacity: f64,
    pub initial_reputation: i32,
    pub expiry_penalty: i32,
    pub on_time_reward: i32,
    pub late_penalty: i32,
}

impl Default for JobLogicConfig {
    fn default() -> Self {
        Self {
            tile_size: 25.0,
            offer_interval_seconds: 5.0,
            initial_offer_timer_seconds: 3.0,
            offer_ttl_seconds: 15.0,
            delivery_window_seconds: 10.0,
            max_active_offers: 4,
            pickup_radius_cells: 3,
            dropoff_radius_cells: 3,
            weight_capacity: 5.0,
            initial_reputation: 70,
            expiry_penalty: 5,
            on_time_reward: 10,
            late_penalty: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub time_limit_seconds: f64,
    pub money_goal: f64,
    /// The run is lost once reputation drops below this value.
    pub reputation_floor: i32,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            time_limit_seconds: 600.0,
            money_goal: 1500.0,
            reputation_floor: 20,
        }
    }
}
