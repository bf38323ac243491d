//! Static reference tables: realm ladder, sect ranks, sects, locations,
//! talents, and the seed NPC roster. Read-only after initialization.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::npc::{Npc, RelationshipStatus};
use crate::player::{
    CultivationTechnique, Gender, Item, ItemEffects, ItemType, TechniqueEffects, TechniqueRank,
};

/// A tier in the cultivation ladder. Gates lifespan and breakthrough thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Realm {
    pub name: &'static str,
    pub min_cultivation: f64,
    pub max_age: f64,
}

pub const REALMS: [Realm; 6] = [
    Realm { name: "Luyện Khí", min_cultivation: 0.0, max_age: 100.0 },
    Realm { name: "Trúc Cơ", min_cultivation: 1_000.0, max_age: 200.0 },
    Realm { name: "Kết Đan", min_cultivation: 5_000.0, max_age: 500.0 },
    Realm { name: "Nguyên Anh", min_cultivation: 25_000.0, max_age: 1_500.0 },
    Realm { name: "Hóa Thần", min_cultivation: 100_000.0, max_age: 5_000.0 },
    Realm { name: "Đại Thừa", min_cultivation: 500_000.0, max_age: 10_000.0 },
];

#[must_use]
pub fn realm_index(name: &str) -> Option<usize> {
    REALMS.iter().position(|r| r.name == name)
}

#[must_use]
pub fn realm_by_name(name: &str) -> Option<&'static Realm> {
    REALMS.iter().find(|r| r.name == name)
}

/// A promotion tier within the player's sect. Gates the yearly salary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectRank {
    pub name: &'static str,
    pub realm_required: &'static str,
    pub salary: i64,
}

pub const SECT_RANKS: [SectRank; 5] = [
    SectRank { name: "Ngoại Môn Đệ Tử", realm_required: "Luyện Khí", salary: 50 },
    SectRank { name: "Nội Môn Đệ Tử", realm_required: "Trúc Cơ", salary: 200 },
    SectRank { name: "Trưởng Lão", realm_required: "Kết Đan", salary: 1_000 },
    SectRank { name: "Phó Tông Chủ", realm_required: "Nguyên Anh", salary: 5_000 },
    SectRank { name: "Tông Chủ", realm_required: "Hóa Thần", salary: 20_000 },
];

#[must_use]
pub fn rank_index(name: &str) -> Option<usize> {
    SECT_RANKS.iter().position(|r| r.name == name)
}

#[must_use]
pub fn rank_by_name(name: &str) -> Option<&'static SectRank> {
    SECT_RANKS.iter().find(|r| r.name == name)
}

/// Highest rank whose required realm is at or below the given realm index.
#[must_use]
pub fn eligible_rank(realm_idx: usize) -> &'static SectRank {
    SECT_RANKS
        .iter()
        .rev()
        .find(|rank| realm_index(rank.realm_required).is_some_and(|req| realm_idx >= req))
        .unwrap_or(&SECT_RANKS[0])
}

/// Rank at which the sect grants its milestone technique.
pub const TECHNIQUE_MILESTONE_RANK: &str = "Trưởng Lão";

#[must_use]
pub fn milestone_technique() -> CultivationTechnique {
    CultivationTechnique {
        name: "Tử Phủ Chân Quyết".to_string(),
        rank: TechniqueRank::LinhPham,
        description: "Chân quyết trấn phái, chỉ truyền cho trưởng lão trở lên.".to_string(),
        effects: TechniqueEffects {
            cultivation_bonus: 20.0,
        },
    }
}

/// Name used for unaffiliated players (legacy saves lacking a sect).
pub const FREE_CULTIVATOR: &str = "Tán Tu";

/// The neutral market district hosting auctions.
pub const AUCTION_VENUE: &str = "Giao Lưu Phường";

#[derive(Debug, Clone)]
pub struct Location {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

pub const LOCATIONS: [Location; 7] = [
    Location { id: "forest", name: "Rừng Rậm", description: "Một khu rừng cổ xưa đầy rẫy yêu thú và cơ duyên." },
    Location { id: "city", name: "Thành Trấn", description: "Một trung tâm buôn bán sầm uất, nơi có thể tìm thấy mọi thứ." },
    Location { id: "sea", name: "Biển Cả", description: "Vùng biển sâu thẳm ẩn chứa nhiều bí mật và kho báu." },
    Location { id: "thien-kiem", name: "Thiên Kiếm Tông", description: "Nơi các kiếm tu mài giũa kiếm ý của mình." },
    Location { id: "van-duoc", name: "Vạn Dược Cốc", description: "Không khí tràn ngập mùi thuốc, là thánh địa của các luyện đan sư." },
    Location { id: "huyen-phu", name: "Huyền Phù Môn", description: "Những ngọn núi lơ lửng được kết nối bằng các cây cầu ánh sáng." },
    Location { id: "giao_luu_phuong", name: "Giao Lưu Phường", description: "Một khu chợ trung lập nơi các tu sĩ từ các tông môn khác nhau tụ họp." },
];

#[must_use]
pub fn location_by_name(name: &str) -> Option<&'static Location> {
    LOCATIONS.iter().find(|l| l.name == name)
}

/// Talent grades selected at character creation. The bonus feeds the passive
/// cultivation gain every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TalentGrade {
    Thien,
    Song,
    Tam,
    Tu,
    Nguy,
}

impl TalentGrade {
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Thien => "Thiên Linh Căn",
            Self::Song => "Song Linh Căn",
            Self::Tam => "Tam Linh Căn",
            Self::Tu => "Tứ Linh Căn",
            Self::Nguy => "Nguỵ Linh Căn",
        }
    }

    #[must_use]
    pub const fn cultivation_bonus(self) -> f64 {
        match self {
            Self::Thien => 20.0,
            Self::Song => 15.0,
            Self::Tam => 10.0,
            Self::Tu => 5.0,
            Self::Nguy => 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FamilyBackground {
    /// Merchant clan: extra starting linh thạch.
    Merchant,
    /// Martial clan: hardier body.
    Martial,
    /// Fallen clan: an heirloom technique better than the common one.
    Fallen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SectChoice {
    ThienKiem,
    VanDuoc,
    HuyenPhu,
}

/// A starter item template owned by a sect.
#[derive(Debug, Clone)]
pub struct SectStarterItem {
    pub name: &'static str,
    pub item_type: ItemType,
    pub description: &'static str,
    pub attack: f64,
    pub health: f64,
}

#[derive(Debug, Clone)]
pub struct SectDetails {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub attack: f64,
    pub defense: f64,
    pub max_health: f64,
    pub linh_thach: i64,
    pub starter_items: Vec<SectStarterItem>,
    pub starting_technique: Option<CultivationTechnique>,
}

pub static SECTS: Lazy<Vec<SectDetails>> = Lazy::new(|| {
    vec![
        SectDetails {
            id: "thien-kiem",
            name: "Thiên Kiếm Tông",
            description: "Nổi danh với kiếm pháp vô song. Đệ tử tập trung vào tấn công thuần túy.",
            attack: 10.0,
            defense: -5.0,
            max_health: 0.0,
            linh_thach: 0,
            starter_items: vec![SectStarterItem {
                name: "Kiếm Tân Thủ",
                item_type: ItemType::Weapon,
                description: "Một thanh kiếm sắc bén cho người mới bắt đầu.",
                attack: 5.0,
                health: 0.0,
            }],
            starting_technique: Some(CultivationTechnique {
                name: "Thiên Kiếm Quyết".to_string(),
                rank: TechniqueRank::PhamPham,
                description: "Công pháp nhập môn của Thiên Kiếm Tông.".to_string(),
                effects: TechniqueEffects {
                    cultivation_bonus: 7.0,
                },
            }),
        },
        SectDetails {
            id: "van-duoc",
            name: "Vạn Dược Cốc",
            description: "Các bậc thầy về luyện đan và chữa trị, có lợi thế về sinh tồn.",
            attack: 0.0,
            defense: 0.0,
            max_health: 10.0,
            linh_thach: 0,
            starter_items: vec![
                SectStarterItem {
                    name: "Hồi Máu Đan",
                    item_type: ItemType::Consumable,
                    description: "Phục hồi 30 sinh mệnh.",
                    attack: 0.0,
                    health: 30.0,
                },
                SectStarterItem {
                    name: "Hồi Máu Đan",
                    item_type: ItemType::Consumable,
                    description: "Phục hồi 30 sinh mệnh.",
                    attack: 0.0,
                    health: 30.0,
                },
            ],
            starting_technique: None,
        },
        SectDetails {
            id: "huyen-phu",
            name: "Huyền Phù Môn",
            description: "Sử dụng nghệ thuật Phù Chú bí truyền, khởi đầu với tài chính dồi dào.",
            attack: 0.0,
            defense: 0.0,
            max_health: 0.0,
            linh_thach: 150,
            starter_items: vec![
                SectStarterItem {
                    name: "Công Kích Phù",
                    item_type: ItemType::Consumable,
                    description: "Tạo ra một quả cầu lửa gây sát thương.",
                    attack: 0.0,
                    health: 0.0,
                },
                SectStarterItem {
                    name: "Phòng Ngự Phù",
                    item_type: ItemType::Consumable,
                    description: "Tạo ra một lá chắn ánh sáng tạm thời.",
                    attack: 0.0,
                    health: 0.0,
                },
            ],
            starting_technique: None,
        },
    ]
});

#[must_use]
pub fn sect_details(choice: SectChoice) -> &'static SectDetails {
    let id = match choice {
        SectChoice::ThienKiem => "thien-kiem",
        SectChoice::VanDuoc => "van-duoc",
        SectChoice::HuyenPhu => "huyen-phu",
    };
    SECTS
        .iter()
        .find(|s| s.id == id)
        .unwrap_or(&SECTS[0])
}

/// The fixed roster every new game starts with.
pub static INITIAL_NPCS: Lazy<Vec<Npc>> = Lazy::new(|| {
    vec![
        Npc {
            id: "npc_lam_van".to_string(),
            name: "Lam Vân".to_string(),
            gender: Gender::Female,
            description: "Một nữ tu lạnh lùng nhưng có trái tim ấm áp, thiên phú kiếm đạo kinh người.".to_string(),
            realm: REALMS[0].name.to_string(),
            cultivation: 10.0,
            relationship_points: 0,
            status: RelationshipStatus::Stranger,
            is_lover: false,
            avatar_url: None,
        },
        Npc {
            id: "npc_thach_nghi".to_string(),
            name: "Thạch Nghị".to_string(),
            gender: Gender::Male,
            description: "Hành sự bá đạo, luôn coi mình là trung tâm. Sẵn sàng làm mọi thứ để mạnh hơn.".to_string(),
            realm: REALMS[0].name.to_string(),
            cultivation: 15.0,
            relationship_points: -5,
            status: RelationshipStatus::Stranger,
            is_lover: false,
            avatar_url: None,
        },
        Npc {
            id: "npc_tieu_y_tien".to_string(),
            name: "Tiêu Y Tiên".to_string(),
            gender: Gender::Female,
            description: "Tinh thông y thuật và dụng độc, tính cách thất thường, khó đoán.".to_string(),
            realm: REALMS[0].name.to_string(),
            cultivation: 8.0,
            relationship_points: 5,
            status: RelationshipStatus::Stranger,
            is_lover: false,
            avatar_url: None,
        },
        Npc {
            id: "npc_han_thien".to_string(),
            name: "Hàn Thiên".to_string(),
            gender: Gender::Male,
            description: "Một tán tu trầm mặc, ít nói nhưng tâm tư sâu sắc và hành sự cẩn trọng.".to_string(),
            realm: REALMS[0].name.to_string(),
            cultivation: 12.0,
            relationship_points: 0,
            status: RelationshipStatus::Stranger,
            is_lover: false,
            avatar_url: None,
        },
    ]
});

/// Templates the shop and the auction draw their stock from. Prices are the
/// base market value before realm scaling.
#[derive(Debug, Clone)]
pub struct MarketTemplate {
    pub name: &'static str,
    pub item_type: ItemType,
    pub description: &'static str,
    pub attack: f64,
    pub defense: f64,
    pub health: f64,
    pub cultivation: f64,
    pub base_cost: i64,
}

pub const MARKET_TEMPLATES: [MarketTemplate; 8] = [
    MarketTemplate { name: "Huyết Tinh Đan", item_type: ItemType::Consumable, description: "Đan dược giúp tăng cường tu vi.", attack: 0.0, defense: 0.0, health: 0.0, cultivation: 200.0, base_cost: 400 },
    MarketTemplate { name: "Hồi Nguyên Đan", item_type: ItemType::Consumable, description: "Phục hồi 50 sinh mệnh.", attack: 0.0, defense: 0.0, health: 50.0, cultivation: 0.0, base_cost: 150 },
    MarketTemplate { name: "Thanh Phong Kiếm", item_type: ItemType::Weapon, description: "Kiếm nhẹ như gió, sắc bén dị thường.", attack: 12.0, defense: 0.0, health: 0.0, cultivation: 0.0, base_cost: 800 },
    MarketTemplate { name: "Huyền Thiết Giáp", item_type: ItemType::Armor, description: "Giáp rèn từ huyền thiết ngàn năm.", attack: 0.0, defense: 12.0, health: 0.0, cultivation: 0.0, base_cost: 800 },
    MarketTemplate { name: "Tụ Linh Bội", item_type: ItemType::Accessory, description: "Ngọc bội tụ linh khí trời đất.", attack: 3.0, defense: 3.0, health: 0.0, cultivation: 0.0, base_cost: 1_200 },
    MarketTemplate { name: "Phá Cảnh Đan", item_type: ItemType::Consumable, description: "Đan dược quý hiếm, tu vi tăng vọt.", attack: 0.0, defense: 0.0, health: 0.0, cultivation: 1_000.0, base_cost: 2_500 },
    MarketTemplate { name: "Linh Thạch Khoáng Mẫu", item_type: ItemType::Material, description: "Khoáng mẫu thượng phẩm, giá trị liên thành.", attack: 0.0, defense: 0.0, health: 0.0, cultivation: 0.0, base_cost: 2_000 },
    MarketTemplate { name: "Long Lân Thuẫn", item_type: ItemType::Armor, description: "Thuẫn khảm vảy giao long, thủy hỏa bất xâm.", attack: 0.0, defense: 20.0, health: 0.0, cultivation: 0.0, base_cost: 3_000 },
];

/// Name pools for generated tournament opponents. Drawn without replacement.
pub const OPPONENT_NAMES: [&str; 15] = [
    "Lý Phù Trần", "Hàn Lập", "Vương Lâm", "Mạnh Hạo", "Tần Vũ", "Lâm Động",
    "Tiêu Viêm", "Diệp Phàm", "Thạch Hạo", "Đường Tam", "Cổ Nguyệt Phương Nguyên",
    "Bạch Tiểu Thuần", "Tô Minh", "La Phong", "Lâm Minh",
];

pub const OPPONENT_TITLES: [&str; 15] = [
    "Kiếm Si", "Sát Thần", "Ma Quân", "Yêu Nghiệt", "Thiên Tài", "Cổ Đồng",
    "Trận Sư", "Đan Vương", "Phù Hoàng", "Thánh Thủ", "Chiến Tôn", "Huyết Sát",
    "Băng Đế", "Lôi Hoàng", "Dược Thần",
];

impl Item {
    /// Materialize a market template into a live item with the given id.
    #[must_use]
    pub fn from_template(template: &MarketTemplate, id: String, cost: i64) -> Self {
        Self {
            id,
            name: template.name.to_string(),
            item_type: template.item_type,
            description: template.description.to_string(),
            effects: ItemEffects {
                attack: template.attack,
                defense: template.defense,
                health: template.health,
                cultivation: template.cultivation,
            },
            cost: Some(cost),
            technique: None,
        }
    }
}
