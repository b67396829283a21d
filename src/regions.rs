//! Static lookup tables for the DWD forecast regions and allergens.
//!
//! Pure reference data. Partregion id `-1` with an empty name means the
//! region has no sub-division.

use serde::Serialize;

/// One forecast region group with its partregions.
#[derive(Debug, Clone, Copy)]
pub struct Region {
  pub id: i32,
  pub name: &'static str,
  pub partregions: &'static [(i32, &'static str)],
}

pub const REGIONS: &[Region] = &[
  Region {
    id: 10,
    name: "Schleswig-Holstein und Hamburg",
    partregions: &[
      (11, "Inseln und Marschen"),
      (12, "Geest, Schleswig-Holstein und Hamburg"),
    ],
  },
  Region {
    id: 20,
    name: "Mecklenburg-Vorpommern",
    partregions: &[(-1, "")],
  },
  Region {
    id: 30,
    name: "Niedersachsen und Bremen",
    partregions: &[
      (31, "Westl. Niedersachsen/Bremen"),
      (32, "Östl. Niedersachsen"),
    ],
  },
  Region {
    id: 40,
    name: "Nordrhein-Westfalen",
    partregions: &[
      (41, "Rhein.-Westfäl. Tiefland"),
      (42, "Ostwestfalen"),
      (43, "Mittelgebirge NRW"),
    ],
  },
  Region {
    id: 50,
    name: "Brandenburg und Berlin",
    partregions: &[(-1, "")],
  },
  Region {
    id: 60,
    name: "Sachsen-Anhalt",
    partregions: &[(61, "Tiefland Sachsen-Anhalt"), (62, "Harz")],
  },
  Region {
    id: 70,
    name: "Thüringen",
    partregions: &[(71, "Tiefland Thüringen"), (72, "Mittelgebirge Thüringen")],
  },
  Region {
    id: 80,
    name: "Sachsen",
    partregions: &[(81, "Tiefland Sachsen"), (82, "Mittelgebirge Sachsen")],
  },
  Region {
    id: 90,
    name: "Hessen",
    partregions: &[
      (91, "Nordhessen und hess. Mittelgebirge"),
      (92, "Rhein-Main"),
    ],
  },
  Region {
    id: 100,
    name: "Rheinland-Pfalz und Saarland",
    partregions: &[
      (101, "Rhein, Pfalz, Nahe und Mosel"),
      (102, "Mittelgebirgsbereich Rheinland-Pfalz"),
      (103, "Saarland"),
    ],
  },
  Region {
    id: 110,
    name: "Baden-Württemberg",
    partregions: &[
      (111, "Oberrhein und unteres Neckartal"),
      (112, "Hohenlohe/mittlerer Neckar/Oberschwaben"),
      (113, "Mittelgebirge Baden-Württemberg"),
    ],
  },
  Region {
    id: 120,
    name: "Bayern",
    partregions: &[
      (121, "Allgäu/Oberbayern/Bay. Wald"),
      (122, "Donauniederungen"),
      (123, "Bayern n. der Donau, o. Bayr. Wald, o. Mainfranken"),
      (124, "Mainfranken"),
    ],
  },
];

/// Allergens covered by the feed.
pub const ALLERGENS: &[&str] = &[
  "Ambrosia", "Beifuss", "Birke", "Erle", "Esche", "Gräser", "Hasel", "Roggen",
];

/// Feed allergen name to botanical name.
pub const ALLERGEN_BOTANICAL_NAMES: &[(&str, &str)] = &[
  ("Ambrosia", "Ambrosia artemisiifolia"),
  ("Beifuss", "Artemisia vulgaris"),
  ("Birke", "Betula"),
  ("Erle", "Alnus"),
  ("Esche", "Fraxinus excelsior"),
  ("Gräser", "Poaceae"),
  ("Hasel", "Corylus"),
  ("Roggen", "Secale cereale"),
];

/// One row of the flattened region table, as printed by `--list`.
#[derive(Debug, Clone, Serialize)]
pub struct RegionEntry {
  pub region_id: i32,
  pub partregion_id: i32,
  pub name: String,
}

/// Flatten [`REGIONS`] into one row per (region, partregion) pair.
pub fn region_entries() -> Vec<RegionEntry> {
  let mut entries = Vec::new();
  for region in REGIONS {
    for (partregion_id, partregion_name) in region.partregions {
      let name = if partregion_name.is_empty() {
        region.name.to_string()
      } else {
        format!("{} - {}", region.name, partregion_name)
      };
      entries.push(RegionEntry {
        region_id: region.id,
        partregion_id: *partregion_id,
        name,
      });
    }
  }
  entries
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_region_entries_flattened() {
    let entries = region_entries();
    // 12 region groups, 27 (region, partregion) pairs in total.
    assert_eq!(entries.len(), 27);

    let berlin = entries
      .iter()
      .find(|e| e.region_id == 50)
      .expect("Brandenburg und Berlin missing");
    assert_eq!(berlin.partregion_id, -1);
    assert_eq!(berlin.name, "Brandenburg und Berlin");

    let harz = entries
      .iter()
      .find(|e| e.region_id == 60 && e.partregion_id == 62)
      .expect("Harz missing");
    assert_eq!(harz.name, "Sachsen-Anhalt - Harz");
  }

  #[test]
  fn test_allergen_tables_consistent() {
    assert_eq!(ALLERGENS.len(), ALLERGEN_BOTANICAL_NAMES.len());
    for (name, _) in ALLERGEN_BOTANICAL_NAMES {
      assert!(ALLERGENS.contains(name));
    }
  }
}
