//! Seed data: a small word bank, demo players and dubbing scenes.
//!
//! Guarantees the service is playable without an external catalogue.

use crate::domain::{DubbingScene, Player, SceneLine, Word, WordId};

fn w(id: WordId, english: &str, translation: &str, level: u32, category: &str, story: Option<&str>) -> Word {
  Word {
    id,
    english: english.into(),
    translation: translation.into(),
    pronunciation: None,
    audio_url: Some(format!("/audio/words/{}.mp3", english.to_lowercase())),
    image_url: None,
    story: story.map(str::to_string),
    difficulty_level: level,
    category: category.into(),
  }
}

pub fn seed_words() -> Vec<Word> {
  vec![
    w(1, "Cat", "猫", 1, "animals", Some("A curious cat slips through the castle gate.")),
    w(2, "Dog", "狗", 1, "animals", None),
    w(3, "Bird", "鸟", 1, "animals", Some("A bird circles the tower, carrying a message.")),
    w(4, "Fish", "鱼", 1, "animals", None),
    w(5, "Horse", "马", 1, "animals", None),
    w(6, "Apple", "苹果", 1, "food", Some("The merchant offers you a shiny apple.")),
    w(7, "Bread", "面包", 1, "food", None),
    w(8, "Rice", "米饭", 1, "food", None),
    w(9, "Milk", "牛奶", 1, "food", None),
    w(10, "Water", "水", 1, "food", None),
    w(11, "Map", "地图", 1, "travel", Some("An old map points to a hidden valley.")),
    w(12, "Train", "火车", 1, "travel", None),
    w(13, "Ticket", "票", 1, "travel", None),
    w(14, "Bridge", "桥", 2, "travel", Some("The bridge sways as the wind picks up.")),
    w(15, "Harbour", "港口", 2, "travel", None),
    w(16, "Luggage", "行李", 2, "travel", None),
    w(17, "Journey", "旅程", 2, "travel", None),
    w(18, "Elephant", "大象", 2, "animals", None),
    w(19, "Dolphin", "海豚", 2, "animals", Some("A dolphin guides your boat past the reef.")),
    w(20, "Butterfly", "蝴蝶", 2, "animals", None),
    w(21, "Vegetable", "蔬菜", 2, "food", None),
    w(22, "Noodles", "面条", 2, "food", None),
    w(23, "Adventure", "冒险", 3, "travel", Some("Every adventure begins with a single step.")),
    w(24, "Destination", "目的地", 3, "travel", None),
    w(25, "Passport", "护照", 3, "travel", None),
    w(26, "Restaurant", "餐厅", 3, "food", None),
    w(27, "Ingredient", "配料", 3, "food", None),
    w(28, "Caterpillar", "毛毛虫", 3, "animals", None),
  ]
}

pub fn seed_players() -> Vec<Player> {
  let p = |id, username: &str, level, experience, coins, preferred: Option<&str>| Player {
    id,
    username: username.into(),
    level,
    experience,
    coins,
    preferred_category: preferred.map(str::to_string),
  };
  vec![
    p(1, "alice", 1, 0, 0, None),
    p(2, "bob", 2, 120, 40, Some("animals")),
    p(3, "chen", 3, 340, 95, Some("travel")),
  ]
}

pub fn seed_scenes() -> Vec<DubbingScene> {
  let line = |id, character: &str, text: &str, audio: &str| SceneLine {
    id,
    character: character.into(),
    text: text.into(),
    audio_url: audio.into(),
  };
  vec![
    DubbingScene {
      id: 1,
      title: "Meet the hero".into(),
      scripts: vec![
        line(1, "Hero", "Hello, my name is Alex. I'm here to help you learn English!", "/audio/hero_hello.mp3"),
        line(2, "Hero", "Let's practice some vocabulary together.", "/audio/hero_vocab.mp3"),
      ],
    },
    DubbingScene {
      id: 2,
      title: "At the market".into(),
      scripts: vec![
        line(1, "Merchant", "Fresh apples! Who wants fresh apples?", "/audio/merchant_apples.mp3"),
        line(2, "Hero", "Two apples and some bread, please.", "/audio/hero_order.mp3"),
        line(3, "Merchant", "That will be three coins.", "/audio/merchant_price.mp3"),
      ],
    },
  ]
}
