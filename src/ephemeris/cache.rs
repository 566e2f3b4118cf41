use std::{collections::HashMap, sync::Arc};

use chrono::Utc;
use h3o::{CellIndex, LatLng, Resolution};
use parking_lot::Mutex;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::{
    store::{cutoff, CacheEntry, SpatialStore},
    Profile, Provider,
};
use crate::{
    config::CacheConfig,
    error::{Result, ValidationError},
    geometry::Point,
};

/// Concurrent misses inside the same cell of this size wait for one fetch.
/// The result is only shared with callers within `max_distance` of it.
const FLIGHT_RESOLUTION: Resolution = Resolution::Seven;

/// Serves assistance data from the store when a fresh entry was fetched
/// near enough, and from the provider otherwise.
pub struct SpatialCache<S, P> {
    store: S,
    provider: P,
    config: CacheConfig,
    flights: Flights,
}

impl<S: SpatialStore, P: Provider> SpatialCache<S, P> {
    pub fn new(store: S, provider: P, config: CacheConfig) -> Self {
        Self {
            store,
            provider,
            config,
            flights: Flights::default(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Returns the payload for `profile` at `point`.
    ///
    /// A fresh provider answer is stored before it is returned. Store and
    /// provider errors are returned as they are and nothing is stored.
    pub async fn get(&self, point: Point, profile: &Profile) -> Result<Vec<u8>> {
        let key = profile.key();
        if let Some(payload) = self.lookup(point, &key).await? {
            debug!(lon = point.lon(), lat = point.lat(), "cache hit");
            return Ok(payload);
        }

        let flight = self.flights.join(FlightKey::new(&key, point)?);
        let mut led = false;
        let shared = flight
            .slot
            .get_or_try_init(|| {
                led = true;
                self.fill(point, profile, &key)
            })
            .await?;

        let near = shared
            .origin
            .is_some_and(|origin| origin.distance(point) <= self.config.max_distance);
        if led || near {
            return Ok(shared.payload.clone());
        }

        debug!(lon = point.lon(), lat = point.lat(), "shared fetch too far away");
        Ok(self.fill(point, profile, &key).await?.payload)
    }

    /// Deletes entries older than the freshness window.
    pub async fn prune(&self) -> Result<u64> {
        let pruned = self.store.prune(cutoff(self.config.ttl())).await?;
        info!(pruned, "pruned ephemeris cache");
        Ok(pruned)
    }

    async fn lookup(&self, point: Point, key: &str) -> Result<Option<Vec<u8>>> {
        self.store
            .find_nearest(key, point, self.config.max_distance, self.config.ttl())
            .await
    }

    async fn fill(&self, point: Point, profile: &Profile, key: &str) -> Result<Filled> {
        // another flight may have stored a nearby answer since the first lookup
        if let Some(payload) = self.lookup(point, key).await? {
            return Ok(Filled {
                origin: None,
                payload,
            });
        }

        info!(lon = point.lon(), lat = point.lat(), "cache miss, fetching");
        let payload = self.provider.fetch_online(Some(point), profile).await?;
        self.store
            .insert(CacheEntry {
                profile: key.to_owned(),
                point,
                payload: payload.clone(),
                created_at: Utc::now(),
            })
            .await?;
        Ok(Filled {
            origin: Some(point),
            payload,
        })
    }
}

/// Outcome of a flight.
#[derive(Debug)]
struct Filled {
    /// where the payload was fetched for, `None` when it came from the store
    origin: Option<Point>,
    payload: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct FlightKey {
    profile: String,
    cell: CellIndex,
}

impl FlightKey {
    fn new(profile: &str, point: Point) -> Result<Self> {
        let ll = LatLng::new(point.lat(), point.lon()).map_err(|_| ValidationError::InvalidCoordinate {
            lon: point.lon(),
            lat: point.lat(),
        })?;
        Ok(Self {
            profile: profile.to_owned(),
            cell: ll.to_cell(FLIGHT_RESOLUTION),
        })
    }
}

type Slot = Arc<OnceCell<Filled>>;

/// In-progress fetches. The lock is never held across an await.
#[derive(Default)]
struct Flights(Mutex<HashMap<FlightKey, Slot>>);

impl Flights {
    fn join(&self, key: FlightKey) -> Flight<'_> {
        let slot = self
            .0
            .lock()
            .entry(key.clone())
            .or_default()
            .clone();
        Flight {
            flights: self,
            key,
            slot,
        }
    }

    fn leave(&self, key: &FlightKey, slot: &Slot) {
        let mut map = self.0.lock();
        if map.get(key).is_some_and(|s| Arc::ptr_eq(s, slot)) {
            map.remove(key);
        }
    }
}

/// Membership in a flight, released on drop so that cancelled or failed
/// callers do not leave the key behind.
struct Flight<'a> {
    flights: &'a Flights,
    key: FlightKey,
    slot: Slot,
}

impl Drop for Flight<'_> {
    fn drop(&mut self) {
        self.flights.leave(&self.key, &self.slot);
    }
}
