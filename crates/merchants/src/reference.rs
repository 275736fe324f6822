//! Static department → municipality reference table.

use serde::Serialize;

/// A department and the municipalities merchants may register in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Department {
    pub department: &'static str,
    pub municipalities: &'static [&'static str],
}

pub static DEPARTMENTS: &[Department] = &[
    Department {
        department: "Antioquia",
        municipalities: &["Medellín", "Envigado", "Bello", "Itagüí", "Rionegro"],
    },
    Department {
        department: "Atlántico",
        municipalities: &["Barranquilla", "Soledad", "Malambo", "Sabanalarga", "Puerto Colombia"],
    },
    Department {
        department: "Bolívar",
        municipalities: &["Cartagena", "Magangué", "Turbaco", "El Carmen de Bolívar", "Mompox"],
    },
    Department {
        department: "Boyacá",
        municipalities: &["Tunja", "Duitama", "Sogamoso", "Chiquinquirá", "Paipa"],
    },
    Department {
        department: "Caldas",
        municipalities: &["Manizales", "Villamaría", "Chinchiná", "La Dorada", "Riosucio"],
    },
    Department {
        department: "Cundinamarca",
        municipalities: &["Zipaquirá", "Chía", "Soacha", "Facatativá", "Girardot"],
    },
    Department {
        department: "Santander",
        municipalities: &["Bucaramanga", "Floridablanca", "Girón", "Piedecuesta", "Barrancabermeja"],
    },
    Department {
        department: "Valle del Cauca",
        municipalities: &["Cali", "Palmira", "Buenaventura", "Tuluá", "Buga"],
    },
    Department {
        department: "Norte de Santander",
        municipalities: &["Cúcuta", "Ocaña", "Pamplona", "Villa del Rosario", "Los Patios"],
    },
    Department {
        department: "Tolima",
        municipalities: &["Ibagué", "Espinal", "Melgar", "Honda", "Chaparral"],
    },
];

/// Iterate every municipality in the table.
pub fn municipalities() -> impl Iterator<Item = &'static str> {
    DEPARTMENTS.iter().flat_map(|d| d.municipalities.iter().copied())
}
