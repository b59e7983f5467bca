/*!
Test Harness pour l'agent Raspiforce

Facilite l'écriture de scénarios avec:
- Ligne de configuration démo scriptée dans le mock CRM
- Assemblage automatique d'un agent sur les doubles
- Assertions sur les messages de chat et les cas créés
*/

use crate::chat_stub::MockChat;
use crate::crm_stub::MockCrm;
use crate::sensor_stub::ScriptedSensor;
use anyhow::Result;
use raspiforce_agent::chat::Notifier;
use raspiforce_agent::cli::RunMode;
use raspiforce_agent::config::TimingConfig;
use raspiforce_agent::session::SessionParams;
use raspiforce_agent::{bootstrap_session, Agent, Startup};
use serde_json::{json, Value};

pub const HOSTNAME: &str = "raspi-01";
pub const DEMO_ID: &str = "a0X000000000001";

pub type TestAgent = Agent<MockCrm, MockChat, ScriptedSensor>;

/// Harness de test complet pour l'agent
pub struct TestHarness {
    pub crm: MockCrm,
    pub chat: MockChat,
    pub sensor: ScriptedSensor,
    pub mode: RunMode,
    pub timing: TimingConfig,
    demo_row: Value,
}

impl TestHarness {
    /// Crée un harness avec une ligne démo sans seuil ni asset
    pub fn new() -> Self {
        tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init()
            .ok();

        Self {
            crm: MockCrm::new(),
            chat: MockChat::new(),
            sensor: ScriptedSensor::default(),
            mode: RunMode::default(),
            timing: TimingConfig::default(),
            demo_row: json!({
                "attributes": { "type": "Raspberry_Pi_Demo__c" },
                "Id": DEMO_ID,
                "Username__c": "demo@example.com",
                "Password__c": "demo-pw",
                "Security_Token__c": "demo-token",
                "Case_Owner__c": "005000000000001",
                "Case_Account_Id__c": "001000000000001",
                "Case_Contact_Id__c": "003000000000001",
                "Case_Asset_Id__c": null,
                "Asset_Prefix__c": "RPI",
                "Asset_Description__c": "Raspberry Pi temperature demo",
                "Case_Status__c": "New",
                "Case_Type__c": "Problem",
                "Case_Subject__c": "Temperature alarm",
                "Alarm_Threshold__c": null
            }),
        }
    }

    /// Remplace un champ de la ligne démo
    pub fn with_field(mut self, field: &str, value: Value) -> Self {
        if let Some(row) = self.demo_row.as_object_mut() {
            row.insert(field.to_string(), value);
        }
        self
    }

    pub fn with_threshold(self, threshold: f64) -> Self {
        self.with_field("Alarm_Threshold__c", json!(threshold))
    }

    /// Asset pré-configuré, connu du mock CRM sous `name`
    pub fn with_existing_asset(self, id: &str, name: &str) -> Self {
        self.crm.respond("FROM Asset", vec![json!({ "Name": name })]);
        self.with_field("Case_Asset_Id__c", json!(id))
    }

    pub fn with_readings(mut self, readings: impl IntoIterator<Item = f64>) -> Self {
        self.sensor = ScriptedSensor::new(readings);
        self
    }

    /// Le capteur reste bloqué après la dernière lecture
    pub fn hanging_after_readings(mut self) -> Self {
        self.sensor = self.sensor.then_hang();
        self
    }

    pub fn simulation(mut self) -> Self {
        self.mode.simulation = true;
        self
    }

    pub fn chat_enabled(mut self) -> Self {
        self.mode.chat = true;
        self
    }

    /// Sans ligne démo active: la recherche renvoie zéro ligne
    pub fn without_demo(mut self) -> Self {
        self.demo_row = Value::Null;
        self
    }

    fn notifier(&self) -> Notifier<MockChat> {
        if self.mode.chat {
            Notifier::new(Some(self.chat.clone()))
        } else {
            Notifier::disabled()
        }
    }

    /// Publie la ligne démo (ou aucune ligne) dans le mock CRM
    pub fn script_demo(&self) {
        let rows = if self.demo_row.is_null() {
            Vec::new()
        } else {
            vec![self.demo_row.clone()]
        };
        self.crm.respond("FROM Raspberry_Pi_Demo__c", rows);
    }

    /// Phase de démarrage sur les doubles, avant toute connexion CRM
    pub fn startup(&self) -> Startup<MockChat, ScriptedSensor> {
        self.script_demo();
        let sensor = if self.mode.simulation {
            None
        } else {
            Some(self.sensor.clone())
        };
        Startup::new(self.notifier(), sensor)
    }

    /// Exécute le bootstrap contre le mock CRM
    pub async fn bootstrap(&self) -> raspiforce_agent::Result<(SessionParams, Notifier<MockChat>)> {
        self.script_demo();

        let mut notifier = self.notifier();
        let session = bootstrap_session(&self.crm, HOSTNAME, &mut notifier).await?;
        Ok((session, notifier))
    }

    /// Bootstrap puis assemble un agent sur les doubles
    pub async fn agent(&self) -> raspiforce_agent::Result<TestAgent> {
        let (session, notifier) = self.bootstrap().await?;
        let sensor = if self.mode.simulation {
            None
        } else {
            Some(self.sensor.clone())
        };

        Ok(Agent::new(
            self.crm.clone(),
            session,
            notifier,
            sensor,
            self.timing.clone(),
            self.mode,
        ))
    }

    /// Assert que les textes envoyés sur `handle` sont exactement `expected`
    pub fn assert_chat_texts(&self, handle: &str, expected: &[&str]) -> Result<()> {
        let actual = self.chat.texts_for(handle);
        if actual != expected {
            anyhow::bail!(
                "Chat mismatch for handle '{}': expected {:?}, got {:?}",
                handle,
                expected,
                actual
            );
        }
        Ok(())
    }

    pub fn cases(&self) -> Vec<Value> {
        self.crm
            .created_of("Case")
            .into_iter()
            .map(|r| r.fields)
            .collect()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
