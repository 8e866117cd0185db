use crate::models::{Category, ConfidenceMap, NoteChoice, NoteLayer, NoteSelection};

fn confidence_of(map: &ConfidenceMap, category: Category) -> f64 {
    map.get(&category).copied().unwrap_or(0.0)
}

/// Highest-confidence member of a layer, the earlier-declared token on ties
fn best_in_layer(map: &ConfidenceMap, layer: NoteLayer) -> NoteChoice {
    let members = layer.members();
    let mut best = NoteChoice {
        category: members[0],
        confidence: confidence_of(map, members[0]),
    };
    for &category in &members[1..] {
        let confidence = confidence_of(map, category);
        if confidence > best.confidence {
            best = NoteChoice {
                category,
                confidence,
            };
        }
    }
    best
}

/// Picks one category per note layer and ranks the rest.
///
/// Missing entries count as zero confidence, so any map is accepted.
pub fn select_notes(confidence: &ConfidenceMap) -> NoteSelection {
    let top = best_in_layer(confidence, NoteLayer::Top);
    let middle = best_in_layer(confidence, NoteLayer::Middle);
    let base = best_in_layer(confidence, NoteLayer::Base);

    let chosen = [top.category, middle.category, base.category];
    let mut others: Vec<NoteChoice> = Category::TAXONOMY
        .iter()
        .filter(|c| !chosen.contains(c))
        .map(|&category| NoteChoice {
            category,
            confidence: confidence_of(confidence, category),
        })
        .collect();
    // Stable sort keeps declaration order among equal confidences
    others.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    NoteSelection {
        top,
        middle,
        base,
        others,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::zero_confidence;

    #[test]
    fn test_one_note_per_layer() {
        let mut map = zero_confidence();
        map.insert(Category::Aquatic, 0.6);
        map.insert(Category::Citrus, 0.3);
        map.insert(Category::Floral, 0.8);
        map.insert(Category::Musk, 0.45);
        map.insert(Category::Woody, 0.9);

        let notes = select_notes(&map);
        assert_eq!(notes.top.category, Category::Aquatic);
        assert_eq!(notes.top.confidence, 0.6);
        assert_eq!(notes.middle.category, Category::Floral);
        assert_eq!(notes.middle.confidence, 0.8);
        assert_eq!(notes.base.category, Category::Woody);
        assert_eq!(notes.base.confidence, 0.9);

        for (choice, layer) in [
            (notes.top, NoteLayer::Top),
            (notes.middle, NoteLayer::Middle),
            (notes.base, NoteLayer::Base),
        ] {
            assert_eq!(choice.category.layer(), Some(layer));
        }
    }

    #[test]
    fn test_all_zero_picks_first_declared() {
        let notes = select_notes(&zero_confidence());
        assert_eq!(notes.top.category, Category::Citrus);
        assert_eq!(notes.middle.category, Category::Floral);
        assert_eq!(notes.base.category, Category::Amber);
        assert_eq!(notes.top.confidence, 0.0);
    }

    #[test]
    fn test_ties_prefer_declaration_order() {
        let mut map = zero_confidence();
        map.insert(Category::Spicy, 0.5);
        map.insert(Category::Powdery, 0.5);
        let notes = select_notes(&map);
        assert_eq!(notes.middle.category, Category::Powdery);
    }

    #[test]
    fn test_others_are_ranked() {
        let mut map = zero_confidence();
        map.insert(Category::Citrus, 0.9);
        map.insert(Category::Green, 0.7);
        map.insert(Category::Oriental, 0.2);

        let notes = select_notes(&map);
        assert_eq!(notes.others.len(), Category::TAXONOMY.len() - 3);
        assert_eq!(notes.others[0].category, Category::Green);
        assert_eq!(notes.others[1].category, Category::Fruity);
        assert!(notes
            .others
            .windows(2)
            .all(|w| w[0].confidence >= w[1].confidence));
    }

    #[test]
    fn test_missing_entries_count_as_zero() {
        let map = ConfidenceMap::from([(Category::Chypre, 0.4)]);
        let notes = select_notes(&map);
        assert_eq!(notes.base.category, Category::Chypre);
        assert_eq!(notes.top.confidence, 0.0);
    }
}
