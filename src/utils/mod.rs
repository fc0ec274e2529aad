pub mod confirmation;
pub mod html;
pub mod jwt;
pub mod mailer;
pub mod permissions;
pub mod validators;
