use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::types::{BOARD_SIZE, Move, NUM_SQUARES};

const MAGIC: &[u8; 4] = b"WPCT";
const VERSION: u32 = 1;
const HEADER_SIZE: usize = 12;
const PAYLOAD_SIZE: usize = NUM_SQUARES * 4;

/// Position table of the baseline engine: corners high, X-squares very low.
const BASELINE_ROWS: [[f32; BOARD_SIZE]; BOARD_SIZE] = [
    [100.0, -20.0, 10.0, 5.0, 5.0, 10.0, -20.0, 100.0],
    [-20.0, -80.0, -2.0, -2.0, -2.0, -2.0, -80.0, -20.0],
    [10.0, -2.0, 1.0, 1.0, 1.0, 1.0, -2.0, 10.0],
    [5.0, -2.0, 1.0, 1.0, 1.0, 1.0, -2.0, 5.0],
    [5.0, -2.0, 1.0, 1.0, 1.0, 1.0, -2.0, 5.0],
    [10.0, -2.0, 1.0, 1.0, 1.0, 1.0, -2.0, 10.0],
    [-20.0, -80.0, -2.0, -2.0, -2.0, -2.0, -80.0, -20.0],
    [100.0, -20.0, 10.0, 5.0, 5.0, 10.0, -20.0, 100.0],
];

/// Weighted piece counter of the advanced engine, corner = 1.0.
const ADVANCED_ROWS: [[f32; BOARD_SIZE]; BOARD_SIZE] = [
    [1.00, -0.25, 0.10, 0.05, 0.05, 0.10, -0.25, 1.00],
    [-0.25, -0.25, 0.01, 0.01, 0.01, 0.01, -0.25, -0.25],
    [0.10, 0.01, 0.05, 0.02, 0.02, 0.05, 0.01, 0.10],
    [0.05, 0.01, 0.02, 0.01, 0.01, 0.02, 0.01, 0.05],
    [0.05, 0.01, 0.02, 0.01, 0.01, 0.02, 0.01, 0.05],
    [0.10, 0.01, 0.05, 0.02, 0.02, 0.05, 0.01, 0.10],
    [-0.25, -0.25, 0.01, 0.01, 0.01, 0.01, -0.25, -0.25],
    [1.00, -0.25, 0.10, 0.05, 0.05, 0.10, -0.25, 1.00],
];

/// Fixed 8x8 table of per-square weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<f32>>", into = "Vec<Vec<f32>>")]
pub struct WeightTable {
    cells: [f32; NUM_SQUARES],
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WeightDocument {
    Wrapped { weights: WeightTable },
    Bare(WeightTable),
}

impl WeightTable {
    pub fn from_rows(rows: [[f32; BOARD_SIZE]; BOARD_SIZE]) -> Result<Self, EngineError> {
        let mut cells = [0.0f32; NUM_SQUARES];
        for (row, values) in rows.iter().enumerate() {
            cells[row * BOARD_SIZE..(row + 1) * BOARD_SIZE].copy_from_slice(values);
        }
        Self::from_cells(cells)
    }

    fn from_cells(cells: [f32; NUM_SQUARES]) -> Result<Self, EngineError> {
        if let Some(pos) = cells.iter().position(|w| !w.is_finite()) {
            return Err(EngineError::WeightFormat(format!(
                "weight at {} is not finite",
                Move::from_index(pos)
            )));
        }
        Ok(Self { cells })
    }

    pub fn baseline() -> Self {
        Self::from_const_rows(&BASELINE_ROWS)
    }

    pub fn advanced() -> Self {
        Self::from_const_rows(&ADVANCED_ROWS)
    }

    fn from_const_rows(rows: &[[f32; BOARD_SIZE]; BOARD_SIZE]) -> Self {
        let mut cells = [0.0f32; NUM_SQUARES];
        for (pos, cell) in cells.iter_mut().enumerate() {
            *cell = rows[pos / BOARD_SIZE][pos % BOARD_SIZE];
        }
        Self { cells }
    }

    pub fn get(&self, mv: Move) -> f32 {
        self.cells[mv.index()]
    }

    /// Sum of the weights of every square set in `mask`, in ascending square order.
    pub fn weighted_sum(&self, mut mask: u64) -> f32 {
        let mut sum = 0.0f32;
        while mask != 0 {
            sum += self.cells[mask.trailing_zeros() as usize];
            mask &= mask - 1;
        }
        sum
    }

    /// `true` when the table is invariant under every rotation and reflection of the board.
    pub fn is_symmetric(&self) -> bool {
        let last = BOARD_SIZE - 1;
        (0..NUM_SQUARES).all(|pos| {
            let (r, c) = (pos / BOARD_SIZE, pos % BOARD_SIZE);
            let w = self.cells[pos];
            w == self.cells[c * BOARD_SIZE + r]
                && w == self.cells[r * BOARD_SIZE + (last - c)]
                && w == self.cells[(last - r) * BOARD_SIZE + c]
        })
    }

    /// Parses `{"weights": [[..]; 8]}` or a bare 8x8 array.
    pub fn from_json(text: &str) -> Result<Self, EngineError> {
        let document: WeightDocument = serde_json::from_str(text)
            .map_err(|err| EngineError::WeightFormat(err.to_string()))?;
        Ok(match document {
            WeightDocument::Wrapped { weights } | WeightDocument::Bare(weights) => weights,
        })
    }

    /// Deserialize from the binary form: magic, version, CRC32 of payload, 64 LE `f32`s.
    pub fn from_bytes(data: &[u8]) -> Result<Self, EngineError> {
        if data.len() < HEADER_SIZE {
            return Err(EngineError::WeightFormat(format!(
                "weights data too short: expected at least {HEADER_SIZE} bytes, got {}",
                data.len()
            )));
        }

        if &data[0..4] != MAGIC {
            return Err(EngineError::WeightFormat(
                "invalid weights magic (expected WPCT)".to_string(),
            ));
        }

        let version = read_u32_le(data, 4)?;
        if version != VERSION {
            return Err(EngineError::WeightFormat(format!(
                "unsupported weights version: expected {VERSION}, got {version}"
            )));
        }

        let expected_crc = read_u32_le(data, 8)?;
        let payload = &data[HEADER_SIZE..];

        let actual_crc = crc32fast::hash(payload);
        if actual_crc != expected_crc {
            return Err(EngineError::WeightFormat(format!(
                "CRC32 mismatch: expected {expected_crc:#010x}, got {actual_crc:#010x}"
            )));
        }

        if payload.len() != PAYLOAD_SIZE {
            return Err(EngineError::WeightFormat(format!(
                "expected {PAYLOAD_SIZE} payload bytes, got {}",
                payload.len()
            )));
        }

        let mut cells = [0.0f32; NUM_SQUARES];
        for (cell, chunk) in cells.iter_mut().zip(payload.chunks_exact(4)) {
            let mut bytes = [0u8; 4];
            bytes.copy_from_slice(chunk);
            *cell = f32::from_le_bytes(bytes);
        }

        Self::from_cells(cells)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut payload = Vec::with_capacity(PAYLOAD_SIZE);
        for w in &self.cells {
            payload.extend_from_slice(&w.to_le_bytes());
        }

        let mut out = Vec::with_capacity(HEADER_SIZE + PAYLOAD_SIZE);
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&VERSION.to_le_bytes());
        out.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
        out.extend_from_slice(&payload);
        out
    }
}

impl TryFrom<Vec<Vec<f32>>> for WeightTable {
    type Error = EngineError;

    fn try_from(rows: Vec<Vec<f32>>) -> Result<Self, Self::Error> {
        if rows.len() != BOARD_SIZE {
            return Err(EngineError::WeightFormat(format!(
                "expected {BOARD_SIZE} rows, got {}",
                rows.len()
            )));
        }

        let mut cells = [0.0f32; NUM_SQUARES];
        for (row, values) in rows.iter().enumerate() {
            if values.len() != BOARD_SIZE {
                return Err(EngineError::WeightFormat(format!(
                    "row {row} has {} columns, expected {BOARD_SIZE}",
                    values.len()
                )));
            }
            cells[row * BOARD_SIZE..(row + 1) * BOARD_SIZE].copy_from_slice(values);
        }
        Self::from_cells(cells)
    }
}

impl From<WeightTable> for Vec<Vec<f32>> {
    fn from(table: WeightTable) -> Self {
        table.cells.chunks(BOARD_SIZE).map(<[f32]>::to_vec).collect()
    }
}

fn read_u32_le(data: &[u8], offset: usize) -> Result<u32, EngineError> {
    if offset + 4 > data.len() {
        return Err(EngineError::WeightFormat(
            "unexpected EOF while reading u32".to_string(),
        ));
    }
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&data[offset..offset + 4]);
    Ok(u32::from_le_bytes(bytes))
}
