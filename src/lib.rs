/*!

A discrete-time, agent-based epidemic simulator. The population is a set of
individuals grouped into households; the simulation advances one day at a
time, moving individuals through a stochastic disease state machine and
evaluating a two-tier (household + population) force-of-infection model for
every susceptible individual.

The crate is organized around a handful of collaborating modules:

* [`population`] — the individual/household containers and the per-day
  population summary used by the transmission model.
* [`disease`] — the core: the disease state machine, the transmission model,
  the date-bucketed transition queue, and the daily driver.
* [`events`] — replay of external demographic events (births, deaths,
  migrations, household moves) from a CSV event log.
* [`report`] — the reporter with its text sink and CSV record writers.
* [`simulation`] — configuration bootstrap and the day-by-day run loop.

*/

pub mod config;
pub mod disease;
pub mod error;
pub mod events;
pub mod logging;
pub mod population;
pub mod random;
pub mod report;
pub mod simulation;

use std::fmt;

pub use config::Config;
pub use error::SimError;
pub use random::SimRng;
pub use simulation::Simulation;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct PersonId(pub u64);

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct HouseholdId(pub u64);

impl fmt::Display for HouseholdId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
