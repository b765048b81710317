pub mod foods;
pub mod health;
pub mod login;
pub mod password_reset;
pub mod register;
pub mod restaurants;
pub mod reviews;
pub mod users;

pub use foods::{add_food, list_foods, recommend_foods};
pub use health::health_check;
pub use login::login;
pub use password_reset::{forgot_password, reset_password, validate_otp};
pub use register::register;
pub use restaurants::{add_restaurant, get_restaurant, list_restaurants, nearby_restaurants};
pub use reviews::get_reviews;
pub use users::{update_profile, upload_image};
