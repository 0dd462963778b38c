//! Reply engine for a Twitter bot that classifies images in mentions.
//!
//! A webhook payload is parsed into [`twitter_parser::TweetCreateEvents`];
//! [`dispatcher::ReplyDispatcher`] decides for each subscribed account whether
//! the tweet (or the tweet it quotes) should be classified, and posts the
//! result.

pub mod classifier;
pub mod config;
pub mod dispatcher;
pub mod eligibility;
pub mod error;
pub mod logging;
pub mod media;
pub mod message;
pub mod twitter;
pub mod twitter_message;
pub mod twitter_parser;

#[cfg(test)]
mod testing;

pub use dispatcher::{AccountReport, ReplyDispatcher, ReplyOutcome};
pub use error::DispatchError;
