/*!
Capteur scripté

Rejoue une suite de lectures. Une fois la suite épuisée, renvoie
`SensorError::Malformed`, comme un fichier de périphérique illisible, ou reste bloqué si `then_hang` a été demandé
(pratique pour tester l'arrêt sur signal).
*/

use parking_lot::Mutex;
use raspiforce_agent::error::SensorError;
use raspiforce_agent::sensor::TemperatureSource;
use std::collections::VecDeque;
use std::sync::Arc;

/// Message d'erreur une fois les lectures scriptées épuisées
pub const EXHAUSTED: &str = "scripted readings exhausted";

#[derive(Default)]
struct Inner {
    readings: VecDeque<f64>,
    reads: usize,
    released: usize,
    hang_when_empty: bool,
}

#[derive(Clone, Default)]
pub struct ScriptedSensor {
    inner: Arc<Mutex<Inner>>,
}

impl ScriptedSensor {
    pub fn new(readings: impl IntoIterator<Item = f64>) -> Self {
        let sensor = Self::default();
        sensor.inner.lock().readings = readings.into_iter().collect();
        sensor
    }

    pub fn then_hang(self) -> Self {
        self.inner.lock().hang_when_empty = true;
        self
    }

    /// Nombre de lectures effectuées
    pub fn reads(&self) -> usize {
        self.inner.lock().reads
    }

    pub fn released(&self) -> usize {
        self.inner.lock().released
    }
}

impl TemperatureSource for ScriptedSensor {
    async fn read_celsius(&mut self) -> Result<f64, SensorError> {
        let next = {
            let mut inner = self.inner.lock();
            let next = inner.readings.pop_front();
            if next.is_some() {
                inner.reads += 1;
            }
            next.ok_or(inner.hang_when_empty)
        };

        match next {
            Ok(reading) => Ok(reading),
            Err(true) => std::future::pending().await,
            Err(false) => Err(SensorError::Malformed(EXHAUSTED.to_string())),
        }
    }

    fn release(&mut self) {
        self.inner.lock().released += 1;
    }
}
