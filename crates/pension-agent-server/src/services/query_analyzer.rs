/// Query Analyzer
/// Decides whether a user message is about pensions (needs retrieval)
/// or can be answered directly

use tracing::debug;

/// Next node of the agent graph after classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextStep {
    /// Pension topic: look up supporting passages first
    Retrieve,
    /// Anything else: answer with the simple template
    Respond,
}

/// Pension and social-security terms. Matched as substrings of the
/// lower-cased message.
pub const PENSION_KEYWORDS: &[&str] = &[
    // Palabras base
    "pensión",
    "pensiones",
    "previsional",
    "previsión",
    "previsión social",
    "reforma",
    "jubilación",
    "jubilacion",
    "jubilado",
    "pensionado",
    "fondo autonomo",
    "bono",
    // Ahorro y aportes
    "ahorro previsional",
    "ahorro obligatorio",
    "aportes previsionales voluntarios",
    "aporte",
    "cotización obligatoria",
    "cotizaciones voluntarias",
    "cotizaciones",
    "apv",
    // Entidades y siglas
    "afp",
    "afps",
    "administradora de fondos de pensiones",
    "fapp",
    "ips",
    "instituto de previsión social",
    "sp",
    "superintendencia de pensiones",
    // Modelos y tipos de pensión
    "capitalización individual",
    "modelo de reparto",
    "retiro de fondos",
    "renta vitalicia",
    "retiro programado",
    "pilar solidario",
    "pilar contributivo",
    "pilar no contributivo",
    // Situaciones y beneficios
    "expectativa de vida",
    "pensión básica solidaria",
    "pensión de vejez",
    "pensión de invalidez",
    "pensión de sobrevivencia",
    "compensacion",
    "beneficios previsionales",
    "dictamen de pensiones",
    // Otros
    "edad de jubilación",
    "edad legal de jubilación",
    "jubilación anticipada",
    "trabajador",
    "empleador",
    "cotizante",
    "certificado de cotizaciones",
    "vejez",
];

pub struct QueryAnalyzer;

impl QueryAnalyzer {
    /// Classify the latest user message
    pub fn classify(message: &str) -> NextStep {
        let query_lower = message.to_lowercase();

        match PENSION_KEYWORDS
            .iter()
            .find(|keyword| query_lower.contains(*keyword))
        {
            Some(keyword) => {
                debug!("Pension topic detected: matched '{}'", keyword);
                NextStep::Retrieve
            }
            None => {
                debug!("No pension keyword found, responding directly");
                NextStep::Respond
            }
        }
    }

    pub fn needs_retrieval(message: &str) -> bool {
        Self::classify(message) == NextStep::Retrieve
    }
}
