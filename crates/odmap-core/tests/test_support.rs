//! Shared test support utilities for integration tests

#![allow(dead_code)]

use odmap_core::{load_specification, DecisionEngine, EngineConfig, MappingSpecification, Record};
use serde_json::json;

/// The credit-risk mapping fixture
pub const CREDIT_MAPPING: &str = include_str!("fixtures/credit_mapping.json");

/// Identifier used wherever a test needs the output to be reproducible
pub const FIXED_DECISION_ID: &str = "Decision_0123456789ab";

/// Parse the credit-risk mapping fixture
pub fn credit_mapping() -> MappingSpecification {
    load_specification(CREDIT_MAPPING).expect("fixture mapping parses")
}

/// A complete credit application as the origination system sends it
pub fn credit_application() -> Record {
    Record::from_json(json!({
        "tipo_activo": "CAR",
        "tipo_cliente": "P",
        "estado_civil": "SOLTERO",
        "tipo_pago": "CONTADO",
        "tipo_producto": "AUTO",
        "pyme_score": 700,
        "rci_tipo_cliente": "E",
        "risk_score": 500,
        "rol": "TITULAR",
        "tipo_vehiculo": "SUV",
        "tipo_trabajo": "ASALARIADO",
        "fecha_decision": "15/08/2023",
        "fecha_solicitud": "01/08/2023",
        "fecha_matriculacion": "01/01/2020",
        "fecha_ultimo_impago": "10/05/2021",
        "fecha_ultima_recuperacion": "20/06/2021",
        "fecha_nacimiento": "05/10/1990",
        "saldo_pendiente": 20000.0,
        "monto_solicitado": 30000.0,
        "valor_eurotax": 15000.0,
        "ingreso_anual_neto": 40000.0,
        "entrada": 5000.0,
        "ingreso_mensual_neto": 3500.0,
        "cuota_mensual": 600.0,
        "ratio_44": 0.25,
        "plazo_meses": 36,
        "antiguedad_laboral_anios": 5,
        "total_incidentes": 0,
        "litigios_impagos_actuales": 0,
        "numero_clientes": 1,
        "cp_tienda": "28080",
        "cp": "28010",
        "codigo_pais": "es",
        "plan_amortizacion": "1.0,2.56,0.0,4.3"
    }))
    .expect("fixture record is flat")
}

/// An engine over the credit mapping with a fixed identifier
pub fn credit_engine() -> DecisionEngine {
    DecisionEngine::new(credit_mapping()).with_decision_id(FIXED_DECISION_ID)
}

/// An engine over `document` with a fixed identifier
pub fn engine_for(document: serde_json::Value) -> DecisionEngine {
    let spec = MappingSpecification::from_value(document).expect("test mapping parses");
    DecisionEngine::with_config(spec, EngineConfig::default()).with_decision_id(FIXED_DECISION_ID)
}
