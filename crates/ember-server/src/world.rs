//! Flat world service.
//!
//! Every column has the same layers, bottom first. Columns are built and
//! compressed on the rayon pool and remembered per position, up to a fixed
//! number of columns; the oldest are forgotten first.

use std::collections::{HashMap, VecDeque};
use std::io::Write;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use ember_net::{ChunkPayload, ChunkRequest, ChunkTicket, GenerationError, WorldService};
use ember_proto::types::{ChunkPos, Position};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use tracing::trace;

const SECTION_HEIGHT: usize = 16;
const MAX_SECTIONS: usize = 16;
const BIOME_PLAINS: u8 = 1;

/// Build one ground-up column in the 1.7 chunk format.
pub fn flat_column(layers: &[u8]) -> Result<ChunkPayload, GenerationError> {
    let layers = &layers[..layers.len().min(SECTION_HEIGHT * MAX_SECTIONS)];
    let sections = layers.len().div_ceil(SECTION_HEIGHT).max(1);

    // Section-major, then y, z, x: layer y starts at y * 256.
    let mut raw = vec![0u8; sections * 4096];
    for (y, &id) in layers.iter().enumerate() {
        raw[y * 256..(y + 1) * 256].fill(id);
    }
    let metadata_and_block_light = sections * 2048 * 2;
    raw.resize(raw.len() + metadata_and_block_light, 0);
    raw.resize(raw.len() + sections * 2048, 0xFF); // sky light
    raw.resize(raw.len() + 256, BIOME_PLAINS);

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(&raw)
        .map_err(|e| GenerationError::Failed(e.to_string()))?;
    let data = encoder
        .finish()
        .map_err(|e| GenerationError::Failed(e.to_string()))?;

    Ok(ChunkPayload {
        primary_bitmap: ((1u32 << sections) - 1) as u16,
        add_bitmap: 0,
        data: Bytes::from(data),
    })
}

/// Generated columns in insertion order, bounded by `capacity`.
struct ColumnMemo {
    columns: HashMap<ChunkPos, ChunkPayload>,
    order: VecDeque<ChunkPos>,
    capacity: usize,
}

impl ColumnMemo {
    fn new(capacity: usize) -> Self {
        Self {
            columns: HashMap::new(),
            order: VecDeque::new(),
            capacity,
        }
    }

    fn get(&self, pos: &ChunkPos) -> Option<ChunkPayload> {
        self.columns.get(pos).cloned()
    }

    fn insert(&mut self, pos: ChunkPos, payload: ChunkPayload) {
        if self.capacity == 0 {
            return;
        }
        if self.columns.insert(pos, payload).is_some() {
            return;
        }
        self.order.push_back(pos);
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.columns.remove(&oldest);
            }
        }
    }

    fn len(&self) -> usize {
        self.columns.len()
    }
}

pub struct FlatWorld {
    name: String,
    layers: Arc<[u8]>,
    generated: Arc<Mutex<ColumnMemo>>,
}

impl FlatWorld {
    /// `cache_columns` bounds how many generated columns are remembered.
    pub fn new(name: impl Into<String>, layers: Vec<u8>, cache_columns: usize) -> Self {
        Self {
            name: name.into(),
            layers: layers.into(),
            generated: Arc::new(Mutex::new(ColumnMemo::new(cache_columns))),
        }
    }

    fn cached(&self, pos: ChunkPos) -> Option<ChunkPayload> {
        self.generated
            .lock()
            .expect("chunk memo poisoned")
            .get(&pos)
    }

    pub fn generated_count(&self) -> usize {
        self.generated.lock().expect("chunk memo poisoned").len()
    }
}

impl WorldService for FlatWorld {
    fn default_world(&self) -> String {
        self.name.clone()
    }

    fn world_exists(&self, world: &str) -> bool {
        world == self.name
    }

    fn spawn_point(&self, _world: &str) -> Position {
        Position::new(8.5, self.layers.len() as f64, 8.5)
    }

    fn level_type(&self, _world: &str) -> String {
        "flat".into()
    }

    fn request_chunk(&self, ticket: ChunkTicket) -> ChunkRequest {
        if ticket.world != self.name {
            let world = ticket.world.clone();
            ticket.complete(Err(GenerationError::UnknownWorld(world)));
            return ChunkRequest::Scheduled;
        }
        if let Some(payload) = self.cached(ticket.pos) {
            return ChunkRequest::Hit(ticket, payload);
        }

        let layers = Arc::clone(&self.layers);
        let generated = Arc::clone(&self.generated);
        rayon::spawn(move || {
            let result = flat_column(&layers);
            if let Ok(payload) = &result {
                trace!("Generated flat chunk {}", ticket.pos);
                generated
                    .lock()
                    .expect("chunk memo poisoned")
                    .insert(ticket.pos, payload.clone());
            }
            ticket.complete(result);
        });
        ChunkRequest::Scheduled
    }
}
