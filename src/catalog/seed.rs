//! Built-in catalog shown when no backend is configured.

use crate::catalog::entities::{Clinic, Doctor, Product, ProductShape};
use crate::catalog::store::{CatalogStore, Collection};

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub fn products() -> Vec<Product> {
    vec![
        Product {
            id: "p1".into(),
            name: "IMPLEO™ Smooth".into(),
            shape: ProductShape::Round,
            description: "Túi ngực tròn vỏ trơn thế hệ mới, mang lại cảm giác mềm mại tự nhiên và độ nhô linh hoạt.".into(),
            image: "https://www.gcaesthetics.com/sites/default/files/2022-02/Impleo_0.png".into(),
            features: strings(&["Vỏ trơn (Smooth)", "Gel mềm Soft Touch™", "Đầy cực trên", "Bảo hành trọn đời"]),
            technology: strings(&[
                "Silicone Gel thế hệ 6",
                "Vỏ đa lớp (Barrier Layer)",
                "Độ đàn hồi > 450%",
                "Tiệt trùng khô",
            ]),
            full_description: Some(
                "IMPLEO™ là dòng túi ngực thế hệ thứ 6 của GC Aesthetics, được thiết kế để đáp ứng nhu cầu \
                 ngày càng cao về độ mềm mại và tính ổn định form dáng. Với công nghệ vỏ trơn tiên tiến, \
                 IMPLEO™ giảm thiểu tối đa tình trạng lộ túi và bao xơ, đồng thời mang lại cảm giác chạm thực tế nhất."
                    .into(),
            ),
        },
        Product {
            id: "p2".into(),
            name: "THE PERLE™".into(),
            shape: ProductShape::Round,
            description: "Dòng túi ngực cao cấp với bề mặt BioQ™ - công nghệ vỏ nano tối ưu hóa tương thích sinh học.".into(),
            image: "https://www.gcaesthetics.com/sites/default/files/2021-03/The%20Perle.png".into(),
            features: strings(&["Bề mặt BioQ™", "Gel kết dính cao", "An toàn tối đa", "Định hình form chuẩn"]),
            technology: strings(&[
                "Bề mặt Nano BioQ™",
                "Emunomic™ Breast Tissue Dynamic Gel",
                "Màng chắn 360 độ",
                "Công nghệ RTV",
            ]),
            full_description: Some(
                "The Perle™ đại diện cho sự kết hợp hoàn hảo giữa nghệ thuật và khoa học. Bề mặt BioQ™ độc quyền \
                 giúp giảm ma sát mô, tăng cường khả năng bám dính nhưng vẫn giữ được độ mềm mại."
                    .into(),
            ),
        },
        Product {
            id: "p3".into(),
            name: "COHESIVE™".into(),
            shape: ProductShape::Anatomical,
            description: "Túi ngực hình giọt nước, giải pháp hoàn hảo cho dáng ngực tự nhiên như thật.".into(),
            image: "https://www.gcaesthetics.com/sites/default/files/2022-02/Cohesive.png".into(),
            features: strings(&["Dáng giọt nước", "Form ổn định", "Phù hợp ngực mỏng", "Tự nhiên nhất"]),
            technology: strings(&[
                "Gel định hình Form-Stable",
                "Kết cấu bề mặt nhám",
                "Thiết kế theo giải phẫu học",
                "Độ bền cơ học cao",
            ]),
            full_description: Some(
                "Dòng túi Cohesive™ hình giọt nước được thiết kế cho những phụ nữ mong muốn vẻ đẹp kín đáo, \
                 tự nhiên, đặc biệt phù hợp với người có mô tuyến vú mỏng hoặc tái tạo ngực."
                    .into(),
            ),
        },
    ]
}

pub fn clinics() -> Vec<Clinic> {
    vec![
        Clinic {
            id: "c1".into(),
            name: "Bệnh viện Thẩm mỹ Kangnam".into(),
            address: "666 Cách Mạng Tháng 8, P.5, Q.Tân Bình, TP.HCM".into(),
            image: "https://benhvienthammykangnam.vn/wp-content/uploads/2019/10/toan-canh-benh-vien-tham-my-kangnam-han-quoc.jpg".into(),
            rating: 4.9,
            features: strings(&["Chuẩn y khoa 5 sao", "Công nghệ 3D Vectra", "Hậu phẫu VIP"]),
            introduction: Some(
                "Bệnh viện Thẩm mỹ Kangnam là đơn vị tiên phong trong việc ứng dụng các công nghệ thẩm mỹ \
                 Hàn Quốc tại Việt Nam."
                    .into(),
            ),
            gallery: strings(&[
                "https://benhvienthammykangnam.vn/wp-content/uploads/2019/10/phong-mo-vo-khuan-mot-chieu.jpg",
                "https://benhvienthammykangnam.vn/wp-content/uploads/2019/10/phong-hau-phau-kangnam.jpg",
            ]),
            phone: None,
            is_partner: true,
        },
        Clinic {
            id: "c2".into(),
            name: "Bệnh viện JW Hàn Quốc".into(),
            address: "44 - 46 - 48 - 50 Tôn Thất Tùng, P.Bến Thành, Q.1, TP.HCM".into(),
            image: "https://benhvienjw.vn/wp-content/uploads/2020/07/benh-vien-tham-my-jw-han-quoc-1.jpg".into(),
            rating: 4.8,
            features: strings(&["Đối tác chính thức GCA", "Bác sĩ Hàn Quốc", "Chuyên sâu nâng ngực"]),
            introduction: Some(
                "Bệnh viện JW Hàn Quốc nổi tiếng với đội ngũ bác sĩ tu nghiệp chuyên sâu và công nghệ \
                 nâng ngực nội soi tiên tiến."
                    .into(),
            ),
            gallery: Vec::new(),
            phone: None,
            is_partner: true,
        },
        Clinic {
            id: "c3".into(),
            name: "Bệnh viện Thẩm mỹ Thu Cúc".into(),
            address: "218 Điện Biên Phủ, Q.3, TP.HCM".into(),
            image: String::new(),
            rating: 4.8,
            features: strings(&["Hệ thống lớn nhất MB", "An toàn tuyệt đối", "Bảo hành dài hạn"]),
            introduction: Some(
                "Với hơn 25 năm kinh nghiệm, Thu Cúc sở hữu quy trình quản lý chất lượng khắt khe và \
                 chế độ bảo hành dài hạn cho khách hàng."
                    .into(),
            ),
            gallery: Vec::new(),
            phone: None,
            is_partner: true,
        },
    ]
}

pub fn doctors() -> Vec<Doctor> {
    vec![
        Doctor {
            id: "d1".into(),
            name: "TS. BS. Richard Huy".into(),
            title: "Giám đốc chuyên môn".into(),
            experience: "20 năm kinh nghiệm".into(),
            hospital: "Hệ thống Kangnam".into(),
            avatar: "https://benhvienthammykangnam.vn/wp-content/uploads/2022/11/dr-richard-huy-kangnam.jpg".into(),
            rating: 5.0,
            bio: Some(
                "Một trong những chuyên gia hàng đầu về phẫu thuật tạo hình tại Việt Nam, thành viên \
                 Hiệp hội Phẫu thuật Thẩm mỹ Quốc tế."
                    .into(),
            ),
            specialties: strings(&[
                "Nâng ngực nội soi",
                "Tạo hình thành bụng",
                "Nâng mũi cấu trúc",
                "Tái phẫu thuật ngực hỏng",
            ]),
            certifications: Vec::new(),
        },
        Doctor {
            id: "d2".into(),
            name: "TS. BS. Nguyễn Phan Tú Dung".into(),
            title: "Tổng Giám đốc".into(),
            experience: "25 năm kinh nghiệm".into(),
            hospital: "Bệnh viện JW".into(),
            avatar: "https://benhvienjw.vn/wp-content/uploads/2019/04/bac-si-tu-dung.jpg".into(),
            rating: 5.0,
            bio: Some(
                "Người tiên phong đưa công nghệ thẩm mỹ Hàn Quốc về Việt Nam, nổi tiếng với các ca \
                 phẫu thuật hàm mặt và nâng ngực phức tạp."
                    .into(),
            ),
            specialties: strings(&["Nâng ngực Nano Chip", "Phẫu thuật hàm mặt", "Hút mỡ công nghệ cao"]),
            certifications: Vec::new(),
        },
        Doctor {
            id: "d3".into(),
            name: "BS. CKII. Nguyễn Thanh Vân".into(),
            title: "Trưởng khoa Phẫu thuật".into(),
            experience: "18 năm kinh nghiệm".into(),
            hospital: "Bệnh viện Thanh Vân".into(),
            avatar: String::new(),
            rating: 4.9,
            bio: Some(
                "Luôn đề cao vẻ đẹp tự nhiên và sự an toàn cho khách hàng; chuyên gia đặt túi ngực đường nách."
                    .into(),
            ),
            specialties: strings(&["Nâng ngực đường nách", "Treo sa trễ", "Thẩm mỹ mắt"]),
            certifications: Vec::new(),
        },
    ]
}

/// Store pre-filled with the built-in rows.
pub fn seeded_store() -> CatalogStore {
    CatalogStore {
        products: Collection::from_items(products()),
        clinics: Collection::from_items(clinics()),
        doctors: Collection::from_items(doctors()),
    }
}
