//! Seed data

use crate::Color;

/// Predictions inserted on first initialization, in id order
pub const SEED_PREDICTIONS: [(&str, Color); 10] = [
    ("Новый год принесёт неожиданную радость!", Color::Red),
    ("Вас ждёт встреча со старым другом", Color::Blue),
    ("Исполнится самое заветное желание", Color::Gold),
    ("Год будет полон путешествий", Color::Green),
    ("Вы найдёте то, что давно искали", Color::Silver),
    ("Ждите приятных финансовых новостей", Color::Gold),
    ("Вас ждёт творческий подъём", Color::Purple),
    ("Здоровье и энергия будут на максимуме", Color::Blue),
    ("Вы научитесь чему-то совершенно новому", Color::Green),
    ("Любовь и гармония войдут в ваш дом", Color::Red),
];
