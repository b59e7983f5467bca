/*!
# Raspiforce DevKit - Doubles de test pour l'agent

Bibliothèque facilitant les tests de l'agent sans Salesforce ni Raspberry Pi:
- CRM en mémoire (requêtes scriptées, créations enregistrées)
- Canal de chat qui enregistre les messages
- Capteur qui rejoue une suite de lectures
- Harness qui assemble un agent complet sur ces doubles
*/

pub mod chat_stub;
pub mod crm_stub;
pub mod sensor_stub;
pub mod test_utils;

pub use chat_stub::MockChat;
pub use crm_stub::{CreatedRecord, MockCrm};
pub use sensor_stub::ScriptedSensor;
pub use test_utils::TestHarness;
