//! Container holding decoded channels by name, the `mdf` output side of a
//! read and the input of the writer.

use std::collections::HashMap;

use log::warn;
use serde::Serialize;

use crate::blocks::conversion::Conversion;
use crate::error::MdfError;
use crate::parsing::decoder::SampleColumn;

/// File-level metadata carried in the HDBlock.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FileMetadata {
    pub author: String,
    pub organisation: String,
    pub project: String,
    pub subject: String,
    pub comment: String,
    pub date: String,
    pub time: String,
}

/// One stored channel with everything needed to convert and re-emit it.
#[derive(Debug)]
pub struct ChannelEntry {
    pub data: SampleColumn,
    pub master: Option<String>,
    pub master_type: u16,
    pub unit: String,
    pub description: String,
    /// Pending raw-to-physical rule; cleared once applied.
    pub conversion: Option<Conversion>,
    pub data_group: usize,
}

#[derive(Debug, Serialize)]
struct ChannelSummary<'a> {
    name: &'a str,
    unit: &'a str,
    description: &'a str,
    master: Option<&'a str>,
    samples: usize,
}

#[derive(Debug, Serialize)]
struct StoreSummary<'a> {
    metadata: &'a FileMetadata,
    channels: Vec<ChannelSummary<'a>>,
}

/// Plain mapping from channel name to [`ChannelEntry`] with per-master
/// grouping. One master key stands for one data group on write.
#[derive(Debug, Default)]
pub struct ChannelStore {
    channels: HashMap<String, ChannelEntry>,
    /// Insertion-ordered master name -> member channel names (the master
    /// itself included).
    masters: Vec<(String, Vec<String>)>,
    pub metadata: FileMetadata,
}

impl ChannelStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a channel column under `name`.
    ///
    /// Re-adding an existing name replaces the previous data and regroups
    /// the channel under `master_name`.
    #[allow(clippy::too_many_arguments)]
    pub fn add_channel(
        &mut self,
        data_group: usize,
        name: &str,
        data: SampleColumn,
        master_name: Option<&str>,
        master_type: u16,
        unit: &str,
        description: &str,
        conversion: Option<Conversion>,
    ) {
        if self.channels.contains_key(name) {
            self.remove_membership(name);
        }

        let master_key = master_name.unwrap_or(name).to_string();
        let group_index = match self.masters.iter().position(|(master, _)| *master == master_key) {
            Some(index) => index,
            None => {
                self.masters.push((master_key, Vec::new()));
                self.masters.len() - 1
            }
        };
        let group = &mut self.masters[group_index].1;
        if !group.iter().any(|member| member == name) {
            group.push(name.to_string());
        }

        self.channels.insert(
            name.to_string(),
            ChannelEntry {
                data,
                master: master_name.map(str::to_string),
                master_type,
                unit: unit.to_string(),
                description: description.to_string(),
                conversion: conversion.filter(|c| !c.is_identity()),
                data_group,
            },
        );
    }

    fn remove_membership(&mut self, name: &str) {
        for (_, members) in &mut self.masters {
            members.retain(|member| member != name);
        }
        self.masters.retain(|(_, members)| !members.is_empty());
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.channels.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&ChannelEntry> {
        self.channels.get(name)
    }

    /// Channel names grouped by master, in insertion order.
    pub fn channel_names(&self) -> Vec<&str> {
        self.masters
            .iter()
            .flat_map(|(_, members)| members.iter().map(String::as_str))
            .collect()
    }

    /// Master groups in insertion order; each entry is one data group on
    /// write.
    pub fn master_groups(&self) -> &[(String, Vec<String>)] {
        &self.masters
    }

    /// Whether `name` is the master of any group.
    pub fn is_master(&self, name: &str) -> bool {
        self.masters.iter().any(|(master, _)| master == name)
    }

    pub fn channel_data(&self, name: &str) -> Option<&SampleColumn> {
        self.channels.get(name).map(|entry| &entry.data)
    }

    pub fn set_channel_data(&mut self, name: &str, data: SampleColumn) {
        if let Some(entry) = self.channels.get_mut(name) {
            entry.data = data;
        }
    }

    /// Applies the pending conversion of one channel.
    ///
    /// Invalid parameters or an unusable formula leave the raw column in
    /// place with a single diagnostic; the pending rule is dropped either
    /// way.
    pub fn convert_channel(&mut self, name: &str) {
        let Some(entry) = self.channels.get_mut(name) else {
            return;
        };
        let Some(conversion) = entry.conversion.take() else {
            return;
        };
        match conversion.apply(name, &entry.data) {
            Ok(converted) => entry.data = converted,
            Err(
                err @ (MdfError::InvalidConversion(_) | MdfError::FeatureUnavailable { .. }),
            ) => {
                warn!("{err}; channel keeps its raw values");
            }
            Err(err) => warn!("conversion of channel {name} failed: {err}"),
        }
    }

    /// Applies every pending conversion.
    pub fn convert_all(&mut self) {
        let names: Vec<String> = self.channels.keys().cloned().collect();
        for name in names {
            self.convert_channel(&name);
        }
    }

    /// JSON dump of the file metadata and a per-channel summary.
    pub fn metadata_json(&self) -> Result<String, MdfError> {
        let mut channels: Vec<ChannelSummary<'_>> = self
            .channel_names()
            .iter()
            .filter_map(|&name| {
                self.channels.get(name).map(|entry| ChannelSummary {
                    name,
                    unit: &entry.unit,
                    description: &entry.description,
                    master: entry.master.as_deref(),
                    samples: entry.data.len(),
                })
            })
            .collect();
        channels.sort_by_key(|summary| summary.name.to_string());
        let summary = StoreSummary { metadata: &self.metadata, channels };
        serde_json::to_string_pretty(&summary)
            .map_err(|err| MdfError::BlockSerializationError(format!("{err}")))
    }
}
