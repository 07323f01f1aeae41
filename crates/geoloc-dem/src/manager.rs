//! DEM tile manager for handling multiple tiles with lazy loading.

use crate::tile::{parse_tile_name, TileBounds};
use crate::{DemError, DemTile, Result};
use geoloc_core::ElevationRegionSummary;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::debug;

/// Tile key based on the northwest corner of a 1x1 degree tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct TileKey {
    /// Latitude of the north edge.
    lat: i32,
    /// Longitude of the west edge.
    lon: i32,
}

impl TileKey {
    /// Create a tile key for a given coordinate.
    fn from_coord(lat: f64, lon: f64) -> Self {
        // Coordinate (47.5, -122.5) is in tile n48w123
        TileKey {
            lat: lat.ceil() as i32,
            lon: lon.floor() as i32,
        }
    }

    /// Create a tile key from a tile's bounds.
    fn from_bounds(bounds: &TileBounds) -> Self {
        TileKey {
            lat: bounds.max_lat.round() as i32,
            lon: bounds.min_lon.round() as i32,
        }
    }

    /// Create a tile key from a USGS filename like "USGS_13_n48w123_*.tif".
    fn from_filename(filename: &str) -> Option<Self> {
        parse_tile_name(filename).map(|(lat, lon)| TileKey { lat, lon })
    }
}

/// Manager for multiple DEM tiles with lazy loading.
///
/// The `DemManager` indexes available tiles by scanning a directory, but only
/// loads tile data into memory when needed. Tiles added with
/// [`DemManager::insert_tile`] stay resident and are never evicted.
///
/// This type is thread-safe and can be shared across threads.
///
/// # Example
///
/// ```no_run
/// use geoloc_dem::DemManager;
///
/// let mut manager = DemManager::new();
/// manager.add_directory("dem_data")?;  // Fast - just indexes files
///
/// // Query elevation - loads only the needed tile
/// let elevation = manager.get_elevation(47.6062, -122.3321)?; // Seattle
/// println!("Seattle elevation: {} meters", elevation);
/// # Ok::<(), geoloc_dem::DemError>(())
/// ```
#[derive(Debug)]
pub struct DemManager {
    /// Available tile files indexed by their northwest corner.
    tile_paths: HashMap<TileKey, PathBuf>,
    /// Tiles supplied in memory.
    resident: HashMap<TileKey, DemTile>,
    /// Cache of loaded tiles (thread-safe for concurrent access).
    cache: RwLock<TileCache>,
    /// Maximum number of tiles to keep in cache.
    max_cache_size: usize,
}

/// LRU cache for loaded tiles.
#[derive(Debug)]
struct TileCache {
    /// Loaded tiles indexed by key.
    tiles: HashMap<TileKey, DemTile>,
    /// Access order for LRU eviction (most recently used at the back).
    access_order: Vec<TileKey>,
}

impl TileCache {
    fn new() -> Self {
        Self {
            tiles: HashMap::new(),
            access_order: Vec::new(),
        }
    }

    fn get(&self, key: &TileKey) -> Option<&DemTile> {
        self.tiles.get(key)
    }

    /// Mark a key as recently used (move to back of access order).
    fn touch(&mut self, key: &TileKey) {
        if let Some(pos) = self.access_order.iter().position(|k| k == key) {
            self.access_order.remove(pos);
            self.access_order.push(*key);
        }
    }

    fn insert(&mut self, key: TileKey, tile: DemTile, max_size: usize) {
        if self.tiles.contains_key(&key) {
            self.touch(&key);
            return;
        }

        while self.tiles.len() >= max_size && !self.access_order.is_empty() {
            let oldest = self.access_order.remove(0);
            debug!("Evicting DEM tile ({}, {})", oldest.lat, oldest.lon);
            self.tiles.remove(&oldest);
        }

        self.tiles.insert(key, tile);
        self.access_order.push(key);
    }

    fn len(&self) -> usize {
        self.tiles.len()
    }

    fn clear(&mut self) {
        self.tiles.clear();
        self.access_order.clear();
    }
}

impl Default for DemManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Default maximum number of tiles to cache.
const DEFAULT_MAX_CACHE_SIZE: usize = 32;

impl DemManager {
    /// Create a new empty DEM manager with default cache size.
    pub fn new() -> Self {
        Self::with_cache_size(DEFAULT_MAX_CACHE_SIZE)
    }

    /// Create a new empty DEM manager with a specified cache size.
    pub fn with_cache_size(max_cache_size: usize) -> Self {
        Self {
            tile_paths: HashMap::new(),
            resident: HashMap::new(),
            cache: RwLock::new(TileCache::new()),
            max_cache_size: max_cache_size.max(1),
        }
    }

    /// Add all GeoTIFF files from a directory to the index.
    ///
    /// This is fast because it only scans filenames without loading tile data.
    /// Files must have a `.tif` extension and follow the USGS naming convention.
    ///
    /// Returns the number of tiles indexed.
    pub fn add_directory<P: AsRef<Path>>(&mut self, dir: P) -> Result<usize> {
        let dir = dir.as_ref();
        let mut count = 0;

        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if !path.extension().is_some_and(|ext| ext == "tif") {
                continue;
            }
            if let Some(key) = path
                .file_name()
                .and_then(|s| s.to_str())
                .and_then(TileKey::from_filename)
            {
                self.tile_paths.insert(key, path);
                count += 1;
            }
        }

        debug!("Indexed {} DEM tiles in {}", count, dir.display());
        Ok(count)
    }

    /// Add a single GeoTIFF file to the index.
    ///
    /// This is fast because it only parses the filename without loading tile data.
    pub fn add_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        let filename = path
            .file_name()
            .and_then(|s| s.to_str())
            .ok_or_else(|| DemError::InvalidFilename(path.display().to_string()))?;

        let key = TileKey::from_filename(filename)
            .ok_or_else(|| DemError::InvalidFilename(filename.to_string()))?;

        self.tile_paths.insert(key, path.to_path_buf());
        Ok(())
    }

    /// Add a tile that is already in memory.
    ///
    /// The tile is keyed by the 1x1 degree cell whose northwest corner is
    /// nearest to its own, and replaces any indexed file for that cell.
    pub fn insert_tile(&mut self, tile: DemTile) {
        let key = TileKey::from_bounds(&tile.bounds());
        self.tile_paths.remove(&key);
        self.resident.insert(key, tile);
    }

    /// Ensure an indexed tile is in the cache.
    fn ensure_tile_loaded(&self, key: TileKey) -> Result<()> {
        {
            let cache = self.cache.read().map_err(|_| DemError::CacheLockPoisoned)?;
            if cache.get(&key).is_some() {
                return Ok(());
            }
        }

        let path = self.tile_paths.get(&key).ok_or(DemError::NoTileFound {
            lat: key.lat as f64,
            lon: key.lon as f64,
        })?;

        let tile = DemTile::from_file(path)?;

        let mut cache = self.cache.write().map_err(|_| DemError::CacheLockPoisoned)?;
        cache.insert(key, tile, self.max_cache_size);

        Ok(())
    }

    /// Run `f` on the tile covering a coordinate, loading it if needed.
    fn with_tile<T>(&self, lat: f64, lon: f64, f: impl FnOnce(&DemTile) -> Result<T>) -> Result<T> {
        let key = TileKey::from_coord(lat, lon);
        if let Some(tile) = self.resident.get(&key) {
            return f(tile);
        }

        self.ensure_tile_loaded(key)?;
        let mut cache = self.cache.write().map_err(|_| DemError::CacheLockPoisoned)?;
        cache.touch(&key);
        let tile = cache.get(&key).ok_or(DemError::NoTileFound { lat, lon })?;
        f(tile)
    }

    /// Get the elevation at a geographic coordinate.
    ///
    /// Loads the required tile on demand if not already cached.
    ///
    /// # Arguments
    /// * `lat` - Latitude in decimal degrees (positive = north)
    /// * `lon` - Longitude in decimal degrees (negative = west)
    ///
    /// # Returns
    /// Elevation in meters, or an error if no tile covers the coordinate.
    pub fn get_elevation(&self, lat: f64, lon: f64) -> Result<f32> {
        self.with_tile(lat, lon, |tile| tile.get_elevation(lat, lon))
    }

    /// Get the elevation at a geographic coordinate using nearest-neighbor sampling.
    ///
    /// Loads the required tile on demand if not already cached.
    pub fn get_elevation_nearest(&self, lat: f64, lon: f64) -> Result<f32> {
        self.with_tile(lat, lon, |tile| tile.get_elevation_nearest(lat, lon))
    }

    /// Summarize the tile covering a coordinate.
    pub fn summary(&self, lat: f64, lon: f64) -> Result<ElevationRegionSummary> {
        self.with_tile(lat, lon, |tile| {
            tile.summary().ok_or(DemError::NoData { lat, lon })
        })
    }

    /// Check if a tile is available (indexed or resident) for the given coordinate.
    ///
    /// Note: This does not check if the tile is currently loaded in memory.
    pub fn has_tile(&self, lat: f64, lon: f64) -> bool {
        let key = TileKey::from_coord(lat, lon);
        self.resident.contains_key(&key) || self.tile_paths.contains_key(&key)
    }

    /// Check if a tile is currently in memory.
    pub fn is_tile_loaded(&self, lat: f64, lon: f64) -> bool {
        let key = TileKey::from_coord(lat, lon);
        self.resident.contains_key(&key)
            || self.cache.read().map(|c| c.get(&key).is_some()).unwrap_or(false)
    }

    /// Get the number of available tiles (not necessarily loaded).
    pub fn tile_count(&self) -> usize {
        self.tile_paths.len() + self.resident.len()
    }

    /// Get the number of file-backed tiles currently cached in memory.
    pub fn loaded_tile_count(&self) -> usize {
        self.cache.read().map(|c| c.len()).unwrap_or(0)
    }

    /// Preload a specific tile into memory.
    ///
    /// Useful when you know you'll need a tile and want to control when loading happens.
    pub fn preload_tile(&self, lat: f64, lon: f64) -> Result<()> {
        let key = TileKey::from_coord(lat, lon);
        if self.resident.contains_key(&key) {
            return Ok(());
        }
        self.ensure_tile_loaded(key)
    }

    /// Drop all cached file-backed tiles.
    ///
    /// The tiles remain indexed and can be reloaded on demand.
    pub fn clear_cache(&self) {
        if let Ok(mut cache) = self.cache.write() {
            cache.clear();
        }
    }

    /// Get the bounding box that covers all available tiles.
    ///
    /// This works without loading any tiles since it uses the tile keys.
    pub fn total_bounds(&self) -> Option<TileBounds> {
        let mut keys = self.tile_paths.keys().chain(self.resident.keys());
        let first = keys.next()?;

        let mut min_lat = first.lat - 1;
        let mut max_lat = first.lat;
        let mut min_lon = first.lon;
        let mut max_lon = first.lon + 1;

        for key in keys {
            min_lat = min_lat.min(key.lat - 1);
            max_lat = max_lat.max(key.lat);
            min_lon = min_lon.min(key.lon);
            max_lon = max_lon.max(key.lon + 1);
        }

        Some(TileBounds {
            min_lat: min_lat as f64,
            max_lat: max_lat as f64,
            min_lon: min_lon as f64,
            max_lon: max_lon as f64,
        })
    }
}
