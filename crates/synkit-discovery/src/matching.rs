use synkit_wire::ServiceDescriptor;

/// What a consumer is looking for: an exact network name and media type,
/// plus a set of labels the publisher's `supplemental_labels` must all
/// contain (extra labels on the publisher side are fine).
#[derive(Debug, Clone)]
pub struct DescriptorQuery {
	pub network_name: String,
	pub media_type: String,
	pub required_labels: Vec<(String, String)>,
}

impl DescriptorQuery {
	pub fn matches(&self, descriptor: &ServiceDescriptor) -> bool {
		descriptor.network_name == self.network_name
			&& descriptor.media_type == self.media_type
			&& self
				.required_labels
				.iter()
				.all(|(k, v)| descriptor.supplemental_labels.get(k).is_some_and(|dv| dv == v))
	}
}

#[cfg(test)]
mod tests {
	use indexmap::IndexMap;

	use super::*;

	fn descriptor(labels: &[(&str, &str)]) -> ServiceDescriptor {
		let mut supplemental_labels = IndexMap::new();
		for (k, v) in labels {
			supplemental_labels.insert(k.to_string(), v.to_string());
		}
		ServiceDescriptor {
			network_name: "PowertrainCAN1".into(),
			media_type: "CAN".into(),
			supplemental_labels,
			participant_name: "ECU1".into(),
			service_name: "CanController1".into(),
		}
	}

	#[test]
	fn matches_when_all_required_labels_present() {
		let query = DescriptorQuery {
			network_name: "PowertrainCAN1".into(),
			media_type: "CAN".into(),
			required_labels: vec![("direction".into(), "rx".into())],
		};
		assert!(query.matches(&descriptor(&[("direction", "rx"), ("extra", "ignored")])));
	}

	#[test]
	fn rejects_on_missing_label() {
		let query = DescriptorQuery {
			network_name: "PowertrainCAN1".into(),
			media_type: "CAN".into(),
			required_labels: vec![("direction".into(), "rx".into())],
		};
		assert!(!query.matches(&descriptor(&[])));
	}

	#[test]
	fn rejects_on_network_name_mismatch() {
		let query =
			DescriptorQuery { network_name: "Other".into(), media_type: "CAN".into(), required_labels: vec![] };
		assert!(!query.matches(&descriptor(&[])));
	}
}
